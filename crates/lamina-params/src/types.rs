use std::fmt;
use std::str::FromStr;

/// The closed set of parameter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterType {
    String,
    Secret,
    Integer,
    Float,
    Bool,
    Date,
    StringList,
    IntegerList,
    FloatList,
    Choice,
    ChoiceList,
    File,
    FileList,
    StringFromFile,
    StringListFromFile,
    KeyValue,
}

impl ParameterType {
    pub const ALL: [ParameterType; 16] = [
        ParameterType::String,
        ParameterType::Secret,
        ParameterType::Integer,
        ParameterType::Float,
        ParameterType::Bool,
        ParameterType::Date,
        ParameterType::StringList,
        ParameterType::IntegerList,
        ParameterType::FloatList,
        ParameterType::Choice,
        ParameterType::ChoiceList,
        ParameterType::File,
        ParameterType::FileList,
        ParameterType::StringFromFile,
        ParameterType::StringListFromFile,
        ParameterType::KeyValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Secret => "secret",
            ParameterType::Integer => "int",
            ParameterType::Float => "float",
            ParameterType::Bool => "bool",
            ParameterType::Date => "date",
            ParameterType::StringList => "stringList",
            ParameterType::IntegerList => "intList",
            ParameterType::FloatList => "floatList",
            ParameterType::Choice => "choice",
            ParameterType::ChoiceList => "choiceList",
            ParameterType::File => "file",
            ParameterType::FileList => "fileList",
            ParameterType::StringFromFile => "stringFromFile",
            ParameterType::StringListFromFile => "stringListFromFile",
            ParameterType::KeyValue => "keyValue",
        }
    }

    /// Human description used in parse error messages
    pub fn expected(&self) -> &'static str {
        match self {
            ParameterType::String | ParameterType::Secret => "a string",
            ParameterType::Integer => "an integer",
            ParameterType::Float => "a finite number",
            ParameterType::Bool => "a boolean (true/false/yes/no/on/off/1/0)",
            ParameterType::Date => "a date (YYYY-MM-DD or RFC 3339)",
            ParameterType::StringList => "a list of strings",
            ParameterType::IntegerList => "a list of integers",
            ParameterType::FloatList => "a list of numbers",
            ParameterType::Choice => "one of the declared choices",
            ParameterType::ChoiceList => "a list of declared choices",
            ParameterType::File => "a readable file path",
            ParameterType::FileList => "a list of readable file paths",
            ParameterType::StringFromFile => "a readable file path",
            ParameterType::StringListFromFile => "a readable file path",
            ParameterType::KeyValue => "key:value entries",
        }
    }

    /// Kinds whose value is a collection and accept repeated flag occurrences
    pub fn is_multi_value(&self) -> bool {
        matches!(
            self,
            ParameterType::StringList
                | ParameterType::IntegerList
                | ParameterType::FloatList
                | ParameterType::ChoiceList
                | ParameterType::FileList
                | ParameterType::KeyValue
        )
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, ParameterType::Choice | ParameterType::ChoiceList)
    }

    /// Kinds that read a file while parsing
    pub fn reads_file(&self) -> bool {
        matches!(
            self,
            ParameterType::File
                | ParameterType::FileList
                | ParameterType::StringFromFile
                | ParameterType::StringListFromFile
        )
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParameterType::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown parameter type: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_round_trip() {
        for ty in ParameterType::ALL {
            assert_eq!(ty.as_str().parse::<ParameterType>(), Ok(ty));
        }
        assert!("nope".parse::<ParameterType>().is_err());
    }

    #[test]
    fn test_multi_value_kinds() {
        assert!(ParameterType::StringList.is_multi_value());
        assert!(ParameterType::KeyValue.is_multi_value());
        assert!(!ParameterType::StringListFromFile.is_multi_value());
        assert!(!ParameterType::Integer.is_multi_value());
    }
}
