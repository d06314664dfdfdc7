use taskdeck_protocol::*;

#[test]
fn test_phone_number_rules() {
    assert!(validate_phone_number("13812345678"));
    assert!(validate_phone_number("19912345678"));
    assert!(!validate_phone_number("12345"));       // too short
    assert!(!validate_phone_number("12812345678")); // second digit 2
    assert!(!validate_phone_number("23812345678")); // leading 2
    assert!(!validate_phone_number("138123456789")); // 12 digits
    assert!(!validate_phone_number("1381234567a"));
}

#[test]
fn test_course_list_rules() {
    assert!(validate_course_list("101"));
    assert!(validate_course_list("101,102,103"));
    assert!(validate_course_list("101, 102 ,103"));
    assert!(!validate_course_list(""));
    assert!(!validate_course_list("101,,102"));
    assert!(!validate_course_list("101,abc"));
    assert!(!validate_course_list("101;102"));
}

#[test]
fn test_invalid_phone_rejected() {
    let err = validate_launch("12345", "secret", "101").unwrap_err();
    assert_eq!(err, ValidationError::InvalidPhone);
}

#[test]
fn test_missing_fields_reported_in_form_order() {
    assert_eq!(
        validate_launch("  ", "", "").unwrap_err(),
        ValidationError::MissingField("username")
    );
    assert_eq!(
        validate_launch("13812345678", "", "101").unwrap_err(),
        ValidationError::MissingField("password")
    );
    assert_eq!(
        validate_launch("13812345678", "pw", " ").unwrap_err(),
        ValidationError::MissingField("list_id")
    );
}

#[test]
fn test_valid_launch_keeps_literal_values() {
    let req = validate_launch(" 13812345678 ", " pw ", " 101,102,103 ").unwrap();
    assert_eq!(req.username, "13812345678");
    assert_eq!(req.password, " pw ");
    assert_eq!(req.list_id, "101,102,103");

    let body = serde_json::to_value(&req).unwrap();
    assert_eq!(body["list_id"], "101,102,103");
}
