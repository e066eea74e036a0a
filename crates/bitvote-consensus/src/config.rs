use {
    anyhow::{anyhow, ensure},
    serde::Deserialize,
    std::path::Path,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Operations each branch and bound run may spend. Every node of the
    /// network has to use the same budget to agree on the result.
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,
}

fn default_max_operations() -> u64 {
    bitvotes::Config::default().max_operations
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
        }
    }
}

impl Configuration {
    pub async fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = tokio::fs::read_to_string(&path).await?;
        Self::parse(&data, path.as_ref())
    }

    fn parse(data: &str, path: &Path) -> anyhow::Result<Self> {
        match toml::from_str::<Self>(data) {
            Ok(self_) => self_.validate(),
            Err(err) if std::env::var("TOML_TRACE_ERROR").is_ok_and(|v| v == "1") => Err(anyhow!(
                "failed to parse TOML config at {}: {err:#?}",
                path.display()
            )),
            Err(_) => Err(anyhow!(
                "failed to parse TOML config at: {}. Set TOML_TRACE_ERROR=1 to print parsing \
                 error but this may leak secrets.",
                path.display()
            )),
        }
    }

    pub fn validate(self) -> anyhow::Result<Self> {
        ensure!(self.max_operations > 0, "max-operations must be positive");
        Ok(self)
    }

    pub fn engine(&self) -> bitvotes::Config {
        bitvotes::Config {
            max_operations: self.max_operations,
        }
    }
}
