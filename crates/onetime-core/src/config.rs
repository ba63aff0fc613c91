use serde::de::DeserializeOwned;

/// Loads process configuration from environment variables.
///
/// Implementors derive `serde::Deserialize`; field names map to upper-cased
/// env vars (`database_url` reads `DATABASE_URL`).
pub trait Config: Sized + DeserializeOwned {
    /// # Panics
    ///
    /// Panics if a required env var is missing or cannot be deserialized.
    fn from_env() -> Self {
        Self::try_from_env().expect("failed to load config from environment")
    }

    fn try_from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Load from an explicit set of `(key, value)` pairs instead of the process env.
    fn from_pairs<I>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(pairs)
    }
}
