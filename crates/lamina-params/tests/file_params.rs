use lamina_params::{
    ParamValue, ParameterDefinition, ParameterLayer, ParameterType, RawValue, TypeRegistry,
};
use std::io::Write;

#[test]
fn test_file_parameter_loads_content_and_checks_extension() -> anyhow::Result<()> {
    let registry = TypeRegistry::standard();
    let layer = ParameterLayer::builder("input", "Input")
        .parameter(
            ParameterDefinition::new("data", ParameterType::File).file_extensions(["csv"]),
        )
        .build(&registry)?;
    let def = layer.definition("data").expect("data defined");
    let handler = registry.handler(def.ty).expect("file handler");

    let mut csv = tempfile::Builder::new().suffix(".csv").tempfile()?;
    write!(csv, "a,b\n1,2\n")?;
    let value = handler.parse(def, &RawValue::Text(csv.path().display().to_string()))?;
    let ParamValue::File(file) = &value else {
        panic!("expected file value");
    };
    assert_eq!(file.content, "a,b\n1,2\n");
    assert_eq!(file.size, 8);
    assert!(handler.validate(def, &value).is_ok());

    let mut json = tempfile::Builder::new().suffix(".json").tempfile()?;
    write!(json, "{{}}")?;
    let value = handler.parse(def, &RawValue::Text(json.path().display().to_string()))?;
    let err = handler.validate(def, &value).unwrap_err();
    assert!(err.reason.contains("allowed extension"));
    Ok(())
}

#[test]
fn test_must_exist_path_string() -> anyhow::Result<()> {
    let registry = TypeRegistry::standard();
    let dir = tempfile::tempdir()?;
    let layer = ParameterLayer::builder("paths", "Paths")
        .parameter(ParameterDefinition::new("root", ParameterType::String).must_exist())
        .build(&registry)?;
    let def = layer.definition("root").expect("root defined");
    let handler = registry.handler(def.ty).expect("string handler");

    let existing = ParamValue::String(dir.path().display().to_string());
    assert!(handler.validate(def, &existing).is_ok());

    let missing = ParamValue::String(dir.path().join("nope").display().to_string());
    assert!(handler.validate(def, &missing).is_err());
    Ok(())
}
