use super::*;
use serde_json::json;

#[test]
fn transcript_accepts_non_blank_string() {
    assert_eq!(transcript(&json!({ "transcript": "turn off the lights" })).unwrap(), "turn off the lights");
}

#[test]
fn transcript_rejects_missing_blank_and_non_string() {
    for body in [json!({}), json!({ "transcript": "   " }), json!({ "transcript": 42 }), json!("text")] {
        let err = transcript(&body).unwrap_err();
        assert_eq!(err.to_string(), "Invalid or missing transcript");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

#[test]
fn registration_trims_trailing_slash() {
    let reg = registration(&json!({ "baseUrl": "http://localhost:4000/", "apiKey": "k" })).unwrap();
    assert_eq!(reg.base_url(), "http://localhost:4000");
    assert_eq!(reg.api_key(), "k");
}

#[test]
fn registration_rejects_bad_shapes() {
    for body in [
        json!({ "apiKey": "k" }),
        json!({ "baseUrl": "http://ok.test" }),
        json!({ "baseUrl": "http://ok.test", "apiKey": "" }),
        json!({ "baseUrl": "not a url", "apiKey": "k" }),
        json!({ "baseUrl": "ftp://files.test", "apiKey": "k" }),
        json!({ "baseUrl": 7, "apiKey": "k" }),
    ] {
        assert_eq!(registration(&body).unwrap_err().to_string(), "Invalid baseUrl or apiKey");
    }
}

#[test]
fn selection_reads_all_fields() {
    let sel = selection(&json!({ "transcript": "go", "serviceId": "abc", "endpointIndex": 2 })).unwrap();
    assert_eq!(sel, Selection { transcript: "go".into(), service_id: "abc".into(), endpoint_index: 2 });
}

#[test]
fn selection_rejects_negative_index() {
    let err = selection(&json!({ "transcript": "go", "serviceId": "abc", "endpointIndex": -1 })).unwrap_err();
    assert_eq!(err, BAD_SELECTION);
}

#[test]
fn selection_requires_a_transcript() {
    for body in [
        json!({ "serviceId": "abc", "endpointIndex": 0 }),
        json!({ "transcript": "  ", "serviceId": "abc", "endpointIndex": 0 }),
    ] {
        let err = selection(&body).unwrap_err();
        assert_eq!(err, BAD_TRANSCRIPT);
    }
}
