use crate::Error;

/// Runtime options controlling how [`map_pairwise_with`] and friends split
/// the work between threads.
///
/// These can be stored alongside other simulation parameters as JSON:
///
/// ```
/// # use celllistmap::MapOptions;
/// let options = MapOptions::from_json(r#"{"parallel": true, "n_batches": 8}"#).unwrap();
/// assert_eq!(options.n_batches, Some(8));
/// ```
///
/// [`map_pairwise_with`]: crate::map_pairwise_with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MapOptions {
    /// Should the batches run in parallel on rayon's thread pool? When this
    /// is `false`, the batches still run (one after the other), which gives
    /// the exact same result as a parallel run with the same `n_batches`.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Number of batches to split the cells into. Each batch accumulates
    /// pairs in its own copy of the output. Defaults to the number of threads
    /// in rayon's pool for parallel runs, and to a single batch otherwise.
    #[serde(default)]
    pub n_batches: Option<usize>,
}

fn default_parallel() -> bool {
    true
}

impl Default for MapOptions {
    fn default() -> MapOptions {
        MapOptions {
            parallel: default_parallel(),
            n_batches: None,
        }
    }
}

impl MapOptions {
    /// Options running everything in the calling thread, with a single batch
    pub fn serial() -> MapOptions {
        MapOptions {
            parallel: false,
            n_batches: None,
        }
    }

    /// Parse options from a JSON string
    pub fn from_json(json: &str) -> Result<MapOptions, Error> {
        let options = serde_json::from_str::<MapOptions>(json)?;
        options.validate()?;
        return Ok(options);
    }

    /// Serialize these options to JSON
    pub fn to_json(&self) -> Result<String, Error> {
        return Ok(serde_json::to_string(self)?);
    }

    /// Get the JSON schema describing these options
    pub fn json_schema() -> Result<serde_json::Value, Error> {
        let schema = schemars::schema_for!(MapOptions);
        return Ok(serde_json::to_value(schema)?);
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.n_batches == Some(0) {
            return Err(Error::InvalidParameter(
                "n_batches must be at least 1".into()
            ));
        }
        return Ok(());
    }

    /// Get the number of batches to use with these options
    pub(crate) fn n_batches(&self) -> Result<usize, Error> {
        self.validate()?;
        let n_batches = match self.n_batches {
            Some(n_batches) => n_batches,
            None if self.parallel => rayon::current_num_threads(),
            None => 1,
        };
        return Ok(n_batches);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = MapOptions::default();
        assert!(options.parallel);
        assert_eq!(options.n_batches, None);
        assert_eq!(options.n_batches().unwrap(), rayon::current_num_threads());

        assert_eq!(MapOptions::serial().n_batches().unwrap(), 1);
        assert_eq!(MapOptions::from_json("{}").unwrap(), MapOptions::default());
    }

    #[test]
    fn json() {
        let options = MapOptions::from_json(r#"{"parallel": false, "n_batches": 3}"#).unwrap();
        assert_eq!(options, MapOptions { parallel: false, n_batches: Some(3) });
        assert_eq!(options.n_batches().unwrap(), 3);

        let json = options.to_json().unwrap();
        assert_eq!(json, r#"{"parallel":false,"n_batches":3}"#);

        let error = MapOptions::from_json(r#"{"threads": 3}"#).unwrap_err();
        assert!(matches!(error, Error::Json(_)));

        let error = MapOptions::from_json(r#"{"n_batches": 0}"#).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: n_batches must be at least 1");
    }

    #[test]
    fn schema() {
        let schema = MapOptions::json_schema().unwrap();
        assert_eq!(schema["title"], "MapOptions");
        assert!(schema["properties"]["parallel"].is_object());
        assert!(schema["properties"]["n_batches"].is_object());
    }
}
