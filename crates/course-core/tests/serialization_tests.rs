mod common;

#[test]
fn test_wire_format_matches_stored_documents() {
    let course = common::course_from_json(
        r#"{
            "name": "algebra",
            "price": 10,
            "picture": "img/algebra.png",
            "preview-url-video": "https://videos.example.com/algebra"
        }"#,
    );

    assert_eq!(course, common::full_course("algebra"));
}

#[test]
fn test_listing_snapshot_survives_cache_encoding() {
    let listing = vec![common::full_course("algebra"), common::full_course("physics")];

    let bytes = serde_json::to_vec(&listing).unwrap();
    let decoded: Vec<course_core::Course> = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(decoded, listing);
}

#[test]
fn test_unknown_fields_are_ignored() {
    let course = common::course_from_json(r#"{"name":"algebra","_id":"abc","legacy":true}"#);

    assert_eq!(course.name, "algebra");
    assert!(course.price.is_none());
}

#[test]
fn test_missing_name_deserializes_as_empty() {
    let course = common::course_from_json(r#"{"price":3.5}"#);

    assert!(course.name.is_empty());
    assert_eq!(course.price, Some(3.5));
}
