use serde::Deserialize;

/// Names of the global bindings a session protects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalCatalog {
    /// Plain values, reassigned directly on restore.
    #[serde(default)]
    pub values: Vec<String>,
    /// Functions, reassigned directly on restore.
    #[serde(default)]
    pub functions: Vec<String>,
    /// Objects, reconciled property by property.
    #[serde(default)]
    pub objects: Vec<String>,
}

impl GlobalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual builtin globals of a scripting host.
    pub fn standard() -> Self {
        Self::new()
            .with_values(&["NaN", "Infinity", "undefined"])
            .with_functions(&[
                "parseInt",
                "parseFloat",
                "isNaN",
                "isFinite",
                "setTimeout",
                "setInterval",
                "clearTimeout",
                "clearInterval",
            ])
            .with_objects(&[
                "Object", "Function", "Array", "String", "Number", "Boolean", "Math", "JSON",
                "Date", "RegExp", "Error", "Promise", "Map", "Set",
            ])
    }

    pub fn with_values(mut self, names: &[&str]) -> Self {
        self.values.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn with_functions(mut self, names: &[&str]) -> Self {
        self.functions.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn with_objects(mut self, names: &[&str]) -> Self {
        self.objects.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.functions.is_empty() && self.objects.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .chain(&self.functions)
            .chain(&self.objects)
            .map(String::as_str)
    }
}
