use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A Gemini model identifier.
///
/// This can be a predefined model or a custom string for models that are not listed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier (for newer or tuned models)
    Custom(String),
}

/// Known Gemini model versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownModel {
    /// Gemini 2.5 Flash
    Gemini25Flash,

    /// Gemini 2.5 Flash-Lite
    Gemini25FlashLite,

    /// Gemini 2.5 Pro
    Gemini25Pro,

    /// Gemini 2.0 Flash
    Gemini20Flash,
}

impl KnownModel {
    const ALL: [KnownModel; 4] = [
        KnownModel::Gemini25Flash,
        KnownModel::Gemini25FlashLite,
        KnownModel::Gemini25Pro,
        KnownModel::Gemini20Flash,
    ];

    /// The identifier used in API paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Gemini25Flash => "gemini-2.5-flash",
            KnownModel::Gemini25FlashLite => "gemini-2.5-flash-lite",
            KnownModel::Gemini25Pro => "gemini-2.5-pro",
            KnownModel::Gemini20Flash => "gemini-2.0-flash",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("models/").unwrap_or(s);
        Ok(KnownModel::ALL
            .into_iter()
            .find(|known| known.as_str() == s)
            .map(Model::Known)
            .unwrap_or_else(|| Model::Custom(s.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Gemini25Flash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let model = Model::Known(KnownModel::Gemini25Flash);
        assert_eq!(model.to_string(), "gemini-2.5-flash");

        let model = Model::Custom("gemini-exp-1206".to_string());
        assert_eq!(model.to_string(), "gemini-exp-1206");
    }

    #[test]
    fn parse_known_and_custom() {
        assert_eq!(
            "gemini-2.5-pro".parse::<Model>().unwrap(),
            Model::Known(KnownModel::Gemini25Pro)
        );
        assert_eq!(
            "models/gemini-2.0-flash".parse::<Model>().unwrap(),
            Model::Known(KnownModel::Gemini20Flash)
        );
        assert_eq!(
            "gemini-exp-1206".parse::<Model>().unwrap(),
            Model::Custom("gemini-exp-1206".to_string())
        );
    }

    #[test]
    fn default_is_flash() {
        assert_eq!(Model::default(), Model::Known(KnownModel::Gemini25Flash));
    }
}
