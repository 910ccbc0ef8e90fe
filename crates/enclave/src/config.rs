//! Run configuration

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Main function the engine calls when none is named.
pub const DEFAULT_MAIN_FUNCTION: &str = "run";

/// Package file holding the main function when none is named.
pub const DEFAULT_MAIN_FILE: &str = "main.star";

/// Instructions the engine runs at once when nothing else is asked for.
pub const DEFAULT_PARALLELISM: u32 = 4;

/// How to run a script or package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Arguments for the main function, as a JSON object
    pub serialized_params: String,
    /// Interpret and validate only, do not execute
    pub dry_run: bool,
    /// Instructions executed concurrently
    pub parallelism: u32,
    /// Function the engine calls
    pub main_function_name: String,
    /// File, relative to the package root, that holds the main function
    pub relative_path_to_main_file: String,
    /// Experimental engine features to switch on, by name
    pub experimental_features: Vec<String>,
    /// Cloud instance the run belongs to
    pub cloud_instance_id: Option<String>,
    /// Cloud user the run belongs to
    pub cloud_user_id: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            serialized_params: "{}".to_string(),
            dry_run: false,
            parallelism: DEFAULT_PARALLELISM,
            main_function_name: DEFAULT_MAIN_FUNCTION.to_string(),
            relative_path_to_main_file: DEFAULT_MAIN_FILE.to_string(),
            experimental_features: Vec::new(),
            cloud_instance_id: None,
            cloud_user_id: None,
        }
    }
}

impl RunConfig {
    /// Serialize `params` as the main function's arguments.
    pub fn with_params<T: Serialize>(mut self, params: &T) -> Result<Self, ClientError> {
        self.serialized_params = serde_json::to_string(params)?;
        Ok(self)
    }

    /// Use already-serialized JSON arguments.
    pub fn with_serialized_params(mut self, params: impl Into<String>) -> Self {
        self.serialized_params = params.into();
        self
    }

    /// Toggle dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set how many instructions run at once.
    pub fn parallelism(mut self, parallelism: u32) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Call a different main function.
    pub fn main_function(mut self, name: impl Into<String>) -> Self {
        self.main_function_name = name.into();
        self
    }

    /// Look for the main function in a different file.
    pub fn main_file(mut self, path: impl Into<String>) -> Self {
        self.relative_path_to_main_file = path.into();
        self
    }

    /// Switch on an experimental engine feature.
    pub fn experimental_feature(mut self, feature: impl Into<String>) -> Self {
        self.experimental_features.push(feature.into());
        self
    }

    /// Check the configuration before it is sent.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.parallelism == 0 {
            return Err(ClientError::InvalidConfig(
                "parallelism must be at least 1".to_string(),
            ));
        }
        let params: serde_json::Value = serde_json::from_str(&self.serialized_params)?;
        if !params.is_object() {
            return Err(ClientError::InvalidConfig(format!(
                "params must be a JSON object, got: {}",
                self.serialized_params
            )));
        }
        Ok(())
    }
}
