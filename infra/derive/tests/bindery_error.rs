#[test]
fn bindery_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/bindery_error_pass.rs");
    t.pass("tests/ui/bindery_error_inspection.rs");
}
