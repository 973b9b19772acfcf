use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;

use crate::error::{CommandLineError, DataLoadingError};
use crate::options::ParsedOptions;

const DEFAULT_CONNECT_TIMEOUT_SECS: i64 = 10;
const ENV_PREFIX: &str = "CU_LOADER";

/// Handle on the file describing the schema and data to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDataSet {
    path: PathBuf,
}

impl FileDataSet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole dataset. An empty file is an error.
    pub async fn read(&self) -> Result<Vec<u8>, DataLoadingError> {
        let contents = tokio::fs::read(&self.path).await?;
        if contents.is_empty() {
            return Err(DataLoadingError::EmptyDataSet(self.path.clone()));
        }
        Ok(contents)
    }
}

/// Overrides applied on top of what the dataset itself declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingOptions {
    pub only_schema: bool,
    pub replication_factor: Option<i32>,
    pub strategy: Option<String>,
}

impl LoadingOptions {
    /// Overrides that are set, in command-line spelling.
    pub fn overrides(&self) -> Vec<String> {
        let mut overrides = vec![];
        if self.only_schema {
            overrides.push("onlySchema".to_string());
        }
        if let Some(replication_factor) = self.replication_factor {
            overrides.push(format!("replicationFactor={replication_factor}"));
        }
        if let Some(strategy) = &self.strategy {
            overrides.push(format!("strategy={strategy}"));
        }
        overrides
    }
}

/// A validated load, built once per successful command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub host: String,
    pub port: String,
    pub cluster_name: String,
    pub file: PathBuf,
    pub only_schema: bool,
    pub replication_factor: Option<i32>,
    pub strategy: Option<String>,
}

impl LoadRequest {
    /// Contact point as `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn dataset(&self) -> FileDataSet {
        FileDataSet::new(&self.file)
    }

    pub fn loading_options(&self) -> LoadingOptions {
        LoadingOptions {
            only_schema: self.only_schema,
            replication_factor: self.replication_factor,
            strategy: self.strategy.clone(),
        }
    }
}

/// Checks what the option table can't express and assembles the request.
pub fn validate(parsed: &ParsedOptions) -> Result<LoadRequest, CommandLineError> {
    let replication_factor = match parsed.value('r') {
        Some(value) => Some(
            value
                .parse::<i32>()
                .map_err(|_| CommandLineError::BadArgumentValue('r'))?,
        ),
        None => None,
    };

    let required = |short: char| {
        parsed
            .value(short)
            .map(str::to_owned)
            .ok_or_else(|| CommandLineError::Parse(format!("Missing required option: {short}")))
    };

    Ok(LoadRequest {
        host: required('h')?,
        port: required('p')?,
        cluster_name: required('c')?,
        file: PathBuf::from(required('f')?),
        only_schema: parsed.has_option('o'),
        replication_factor,
        strategy: parsed.value('s').map(str::to_owned),
    })
}

/// The facility that actually applies a dataset to a cluster.
#[async_trait::async_trait]
pub trait DataLoader: Send + Sync {
    async fn load(
        &self,
        address: &str,
        cluster_name: &str,
        dataset: &FileDataSet,
        options: &LoadingOptions,
    ) -> Result<(), DataLoadingError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSettings {
    pub connect_timeout: Duration,
}

impl LoaderSettings {
    /// Reads `CU_LOADER_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, DataLoadingError> {
        let settings = config::Config::builder()
            .set_default("connect_timeout_secs", DEFAULT_CONNECT_TIMEOUT_SECS)?
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;
        let seconds = settings.get_int("connect_timeout_secs")?;
        let seconds = u64::try_from(seconds).map_err(|_| {
            config::ConfigError::Message(format!(
                "connect_timeout_secs must not be negative, got {seconds}"
            ))
        })?;
        Ok(Self {
            connect_timeout: Duration::from_secs(seconds),
        })
    }
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS as u64),
        }
    }
}

/// Default facility for the binary: streams the raw dataset to the contact
/// point over a plain TCP connection. The receiving side interprets it, so
/// load overrides are not applied here.
#[derive(Debug, Clone, Default)]
pub struct TcpDataLoader {
    settings: Option<LoaderSettings>,
}

impl TcpDataLoader {
    pub fn new(settings: LoaderSettings) -> Self {
        Self {
            settings: Some(settings),
        }
    }

    // Environment is only consulted once a load is actually attempted
    fn settings(&self) -> Result<LoaderSettings, DataLoadingError> {
        match self.settings {
            Some(settings) => Ok(settings),
            None => LoaderSettings::from_env(),
        }
    }
}

#[async_trait::async_trait]
impl DataLoader for TcpDataLoader {
    async fn load(
        &self,
        address: &str,
        cluster_name: &str,
        dataset: &FileDataSet,
        options: &LoadingOptions,
    ) -> Result<(), DataLoadingError> {
        let settings = self.settings()?;
        let contents = dataset.read().await?;
        debug!("Read {} bytes from {:?}", contents.len(), dataset.path());
        if *options != LoadingOptions::default() {
            warn!(
                "Overrides {} are not applied when streaming {:?} to {}",
                options.overrides().join(", "),
                dataset.path(),
                address
            );
        }

        let target = lookup_host(address)
            .await
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| DataLoadingError::UnresolvedAddress(address.to_string()))?;

        let mut stream = timeout(settings.connect_timeout, TcpStream::connect(target))
            .await
            .map_err(|_| DataLoadingError::ConnectTimeout {
                address: address.to_string(),
                seconds: settings.connect_timeout.as_secs(),
            })??;
        debug!("Connected to {:?} from {:?}", target, stream.local_addr()?);

        stream.write_all(&contents).await?;
        stream.shutdown().await?;
        info!(
            "Sent {} bytes of {:?} to cluster {:?} at {}",
            contents.len(),
            dataset.path(),
            cluster_name,
            address
        );
        Ok(())
    }
}
