use vitalstream_domain::CreateEncounterInput;

/// Build the Encounter resource posted when a device stream starts.
pub fn encounter_resource(input: &CreateEncounterInput) -> serde_json::Value {
    serde_json::json!({
        "resourceType": "Encounter",
        "status": "in-progress",
        "subject": {
            "reference": format!("Patient/{}", input.patient_id),
            "display": input.display_name,
        },
        "period": {
            "start": input.start_time.to_rfc3339(),
        },
    })
}

/// Extract the id of the first entry of a search Bundle, if any.
pub fn first_bundle_entry_id(bundle: &serde_json::Value) -> Option<String> {
    bundle
        .get("entry")?
        .as_array()?
        .first()?
        .get("resource")?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

/// Extract the server-assigned id of a created resource.
pub fn resource_id(resource: &serde_json::Value) -> Option<String> {
    resource.get("id")?.as_str().map(str::to_string)
}
