use crate::policy::{forbidden_name, forbidden_target, private_attribute};

#[test]
fn forbidden_names_match() {
    assert!(forbidden_name("eval"));
    assert!(forbidden_name("exec"));
    assert!(forbidden_name("globals"));
    assert!(forbidden_name("locals"));
    assert!(!forbidden_name("print"));
    assert!(!forbidden_name("evaluate"));
}

#[test]
fn forbidden_target_checks_tail() {
    assert!(forbidden_target("eval"));
    assert!(forbidden_target("builtins.eval"));
    assert!(forbidden_target("a.b.exec"));
    assert!(!forbidden_target("numpy.array"));
    assert!(!forbidden_target("eval.harmless"));
}

#[test]
fn private_attributes_start_with_underscore() {
    assert!(private_attribute("_radius"));
    assert!(private_attribute("__class__"));
    assert!(!private_attribute("radius"));
    assert!(!private_attribute(""));
}
