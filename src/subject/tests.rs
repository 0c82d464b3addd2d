use super::*;

#[test]
fn test_single_wildcard_matches_one_element() {
    assert!(matches(
        "GMSEC.MISSION.CONST.SAT.EVT.MSG",
        "GMSEC.*.CONST.SAT.EVT.MSG"
    ));
    assert!(!matches("GMSEC.MISSION.CONST.SAT", "GMSEC.*.CONST.SAT.EVT.MSG"));
    assert!(!matches("GMSEC.CONST.SAT.EVT.MSG", "GMSEC.*.*.CONST.SAT.EVT.MSG"));
}

#[test]
fn test_zero_or_more_and_one_or_more() {
    assert!(matches("GMSEC.MISSION.CONST.SAT", "GMSEC.MISSION.CONST.SAT.+"));
    assert!(!matches("GMSEC.MISSION.CONST.SAT", "GMSEC.MISSION.CONST.SAT.>"));

    assert!(matches("GMSEC.MISSION.CONST.SAT.EVT", "GMSEC.MISSION.CONST.SAT.>"));
    assert!(matches("GMSEC.MISSION.CONST.SAT.EVT.MSG", "GMSEC.MISSION.CONST.SAT.>"));
    assert!(matches("GMSEC.MISSION.CONST.SAT.EVT.MSG", "GMSEC.MISSION.CONST.SAT.+"));
}

#[test]
fn test_mixed_wildcards() {
    assert!(matches("GMSEC.MISSION.CONST.SAT.EVT", "GMSEC.*.CONST.SAT.>"));
    assert!(!matches("GMSEC.MISSION.CONST.SAT", "GMSEC.*.CONST.SAT.>"));
    assert!(matches("GMSEC.MISSION.CONST.SAT", "GMSEC.*.CONST.SAT.+"));
    assert!(matches("A", ">"));
    assert!(matches("A.B.C", "+"));
}

#[test]
fn test_exact_and_case_sensitive() {
    assert!(matches("GMSEC.TEST", "GMSEC.TEST"));
    assert!(!matches("GMSEC.TEST", "GMSEC.test"));
    assert!(!matches("GMSEC.TEST.MORE", "GMSEC.TEST"));
    assert!(!matches("GMSEC", "GMSEC.TEST"));
    assert!(!matches("", "GMSEC"));
}

#[test]
fn test_validate_subject() {
    assert!(validate_subject("GMSEC.MISSION.SAT-1.MSG_A", false).is_ok());
    assert!(validate_subject("GMSEC.mission", false).is_err());
    assert!(validate_subject("GMSEC.mission", true).is_ok());
    assert!(validate_subject("", true).is_err());
    assert!(validate_subject("GMSEC..MSG", true).is_err());
    assert!(validate_subject("GMSEC.MSG.", true).is_err());
    assert!(validate_subject("GMSEC.*", true).is_err());
    assert!(validate_subject("GMSEC.>", true).is_err());
}

#[test]
fn test_validate_pattern() {
    assert!(validate_pattern("GMSEC.*.CONST.>", false).is_ok());
    assert!(validate_pattern("GMSEC.*.*.+", false).is_ok());
    assert!(validate_pattern(">", false).is_ok());
    assert!(validate_pattern("GMSEC.>.CONST", false).is_err());
    assert!(validate_pattern("GMSEC.+.CONST", false).is_err());
    assert!(validate_pattern("GMSEC.A#B", true).is_err());
    assert!(!is_valid_pattern("", true));
}
