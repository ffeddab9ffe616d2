use anyhow::{Result, bail};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};
use lamina_middleware::CliArguments;
use lamina_params::{LayerSet, ParameterDefinition, ParameterType};
use std::collections::HashSet;

/// Build one `clap::Arg` per parameter of every layer.
///
/// Bool flags take an optional `=value` so they never swallow a following
/// positional. Args carry no clap default: a flag that was not given must contribute
/// nothing so that config and environment values are not shadowed.
pub fn layer_args(layers: &LayerSet) -> Result<Vec<Arg>> {
    let mut seen = HashSet::new();
    let mut args = Vec::new();
    for layer in layers {
        for def in layer.definitions() {
            let flag = layer.flag_name(def);
            if !seen.insert(flag.clone()) {
                bail!(
                    "flag --{} is declared by more than one layer (second: '{}')",
                    flag,
                    layer.slug()
                );
            }
            args.push(build_arg(flag, def, layer.name()));
        }
    }
    Ok(args)
}

fn build_arg(flag: String, def: &ParameterDefinition, heading: &str) -> Arg {
    let mut arg = Arg::new(flag.clone())
        .long(flag)
        .help(def.help.clone())
        .help_heading(heading.to_string())
        .value_name(value_name(def.ty))
        .required(false);

    arg = match def.ty {
        ParameterType::Bool => arg
            .action(ArgAction::Set)
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true"),
        ty if ty.is_multi_value() => arg.action(ArgAction::Append),
        _ => arg.action(ArgAction::Set),
    };

    if !def.constraints.choices.is_empty() {
        let choices = def.constraints.choices.join(", ");
        arg = arg.long_help(format!("{} [possible values: {}]", def.help, choices));
    }
    if let Some(short) = def.short_flag {
        arg = arg.short(short);
    }
    arg
}

fn value_name(ty: ParameterType) -> &'static str {
    use ParameterType as T;
    match ty {
        T::Integer | T::IntegerList => "INT",
        T::Float | T::FloatList => "NUM",
        T::Bool => "BOOL",
        T::Date => "DATE",
        T::File | T::FileList | T::StringFromFile | T::StringListFromFile => "PATH",
        T::KeyValue => "KEY:VALUE",
        T::Choice | T::ChoiceList => "CHOICE",
        T::String | T::Secret | T::StringList => "VALUE",
    }
}

/// Collect flags actually given on the command line.
pub fn collect_cli_arguments(layers: &LayerSet, matches: &ArgMatches) -> CliArguments {
    let mut arguments = CliArguments::new();
    for layer in layers {
        for def in layer.definitions() {
            let flag = layer.flag_name(def);
            if matches.value_source(&flag) != Some(ValueSource::CommandLine) {
                continue;
            }
            if let Ok(Some(values)) = matches.try_get_many::<String>(&flag) {
                for value in values {
                    arguments.push(flag.clone(), value.clone());
                }
            }
        }
    }
    arguments
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_params::{ParameterLayer, TypeRegistry};

    fn layers() -> LayerSet {
        let registry = TypeRegistry::standard();
        let layer = ParameterLayer::builder("demo", "Demo")
            .parameter(ParameterDefinition::new("limit", ParameterType::Integer).short('n'))
            .parameter(ParameterDefinition::new("verbose", ParameterType::Bool))
            .parameter(ParameterDefinition::new("tags", ParameterType::StringList))
            .parameter(ParameterDefinition::new("name", ParameterType::String).default_value("x"))
            .build(&registry)
            .expect("valid layer");
        LayerSet::new().with(layer).expect("unique slug")
    }

    fn parse(args: &[&str]) -> CliArguments {
        let layers = layers();
        let command = clap::Command::new("demo").args(layer_args(&layers).expect("args"));
        let matches = command
            .try_get_matches_from(std::iter::once("demo").chain(args.iter().copied()))
            .expect("parsed");
        collect_cli_arguments(&layers, &matches)
    }

    #[test]
    fn test_absent_flags_contribute_nothing() {
        let collected = parse(&[]);
        assert!(collected.is_empty());
    }

    #[test]
    fn test_values_and_repeats() {
        let collected = parse(&["-n", "5", "--tags", "a", "--tags", "b", "--verbose"]);
        assert_eq!(collected.get("limit"), Some(&["5".to_string()][..]));
        assert_eq!(
            collected.get("tags"),
            Some(&["a".to_string(), "b".to_string()][..])
        );
        assert_eq!(collected.get("verbose"), Some(&["true".to_string()][..]));
        assert_eq!(collected.get("name"), None);
    }

    #[test]
    fn test_explicit_bool_value() {
        let collected = parse(&["--verbose=false"]);
        assert_eq!(collected.get("verbose"), Some(&["false".to_string()][..]));
    }

    #[test]
    fn test_duplicate_flags_across_layers_rejected() -> anyhow::Result<()> {
        let registry = TypeRegistry::standard();
        let a = ParameterLayer::builder("a", "A")
            .parameter(ParameterDefinition::new("limit", ParameterType::Integer))
            .build(&registry)?;
        let b = ParameterLayer::builder("b", "B")
            .parameter(ParameterDefinition::new("limit", ParameterType::Integer))
            .build(&registry)?;
        let layers = LayerSet::new().with(a)?.with(b)?;
        assert!(layer_args(&layers).is_err());
        Ok(())
    }
}
