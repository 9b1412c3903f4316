//! Block level replication pair types.

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorDomain, Result};

/// Replication state of a BLR pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum PairStatus {
    NotSynced,
    BackingUp,
    Restoring,
    Resyncing,
    Replicating,
    Suspended,
    Stopped,
    Verifying,
    Problem,
    Failed,
    Starting,
    Stopping,
    Suspending,
    Resuming,
    FailingOver,
    FailoverFailed,
    FailoverDone,
    FailingBack,
    FailbackFailed,
    SwitchingRoles,
    SwitchRolesFailed,
}

impl PairStatus {
    /// Maps the server status code, 0 to 20.
    #[must_use]
    pub fn from_code(code: u64) -> Option<Self> {
        let status = match code {
            0 => Self::NotSynced,
            1 => Self::BackingUp,
            2 => Self::Restoring,
            3 => Self::Resyncing,
            4 => Self::Replicating,
            5 => Self::Suspended,
            6 => Self::Stopped,
            7 => Self::Verifying,
            8 => Self::Problem,
            9 => Self::Failed,
            10 => Self::Starting,
            11 => Self::Stopping,
            12 => Self::Suspending,
            13 => Self::Resuming,
            14 => Self::FailingOver,
            15 => Self::FailoverFailed,
            16 => Self::FailoverDone,
            17 => Self::FailingBack,
            18 => Self::FailbackFailed,
            19 => Self::SwitchingRoles,
            20 => Self::SwitchRolesFailed,
            _ => return None,
        };
        Some(status)
    }
}

/// Kind of replication end point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum EndPointType {
    Virtualization = 1,
    FileSystem = 2,
    Database = 3,
}

impl EndPointType {
    /// Maps the server end point code.
    #[must_use]
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Self::Virtualization),
            2 => Some(Self::FileSystem),
            3 => Some(Self::Database),
            _ => None,
        }
    }
}

/// Recovery type of a BLR pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RecoveryType {
    Live = 1,
    Snapshot = 2,
    Granular = 3,
    GranularV2 = 4,
}

impl RecoveryType {
    /// Maps the server recovery type code.
    #[must_use]
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Self::Live),
            2 => Some(Self::Snapshot),
            3 => Some(Self::Granular),
            4 => Some(Self::GranularV2),
            _ => None,
        }
    }
}

/// One side of a BLR pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairEndpoint {
    /// Client name.
    pub name: String,
    /// Client id.
    pub client_id: u64,
    /// Head (source) or tail (destination) proxy client id.
    pub proxy_client_id: u64,
    /// Client GUID.
    pub guid: String,
    /// End point kind.
    pub endpoint: Option<EndPointType>,
}

/// Recovery point store settings of a granular pair. Intervals are in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpStoreOptions {
    /// Crash consistent recovery point interval.
    pub ccrp_interval: u64,
    /// Application consistent recovery point interval.
    pub acrp_interval: u64,
    /// Maximum recovery point interval.
    pub max_rp_interval: u64,
    /// Merge recovery points older than this.
    pub rp_merge_delay: u64,
    /// Recovery point retention.
    pub rp_retention: u64,
    /// Switch the pair to live after the store has been offline this long.
    pub max_rpstore_offline_time: u64,
    /// Only merge during off-peak hours.
    pub merge_only_off_peak: bool,
    /// Recovery point store, as `(id, name)`.
    pub rpstore: Option<(u64, String)>,
}

impl Default for RpStoreOptions {
    fn default() -> Self {
        Self {
            ccrp_interval: 300,
            acrp_interval: 0,
            max_rp_interval: 21_600,
            rp_merge_delay: 172_800,
            rp_retention: 604_800,
            max_rpstore_offline_time: 0,
            merge_only_off_peak: false,
            rpstore: None,
        }
    }
}

/// One source volume replicated to one destination volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMapping {
    /// GUID of the source volume.
    pub source_guid: String,
    /// Access path of the source volume, e.g. `E:`.
    pub source_path: String,
    /// GUID of the destination volume.
    pub destination_guid: String,
    /// Access path of the destination volume.
    pub destination_path: String,
    /// Size of the source volume in bytes.
    pub source_size: u64,
}

/// Request to create a file system BLR pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsPairCreate {
    /// Source client name.
    pub source_client: String,
    /// Destination client name.
    pub destination_client: String,
    /// Volume pairs to replicate.
    pub volumes: Vec<VolumeMapping>,
    /// Recovery type.
    pub recovery_type: RecoveryType,
    /// Recovery point settings.
    pub rpstore: RpStoreOptions,
}

impl FsPairCreate {
    /// Creates a request between two clients.
    #[must_use]
    pub fn new(
        source_client: impl Into<String>,
        destination_client: impl Into<String>,
        recovery_type: RecoveryType,
    ) -> Self {
        Self {
            source_client: source_client.into(),
            destination_client: destination_client.into(),
            volumes: Vec::new(),
            recovery_type,
            rpstore: RpStoreOptions::default(),
        }
    }

    /// Adds a volume pair.
    #[must_use]
    pub fn with_volume(mut self, volume: VolumeMapping) -> Self {
        self.volumes.push(volume);
        self
    }

    /// Sets the recovery point settings.
    #[must_use]
    pub fn with_rpstore(mut self, rpstore: RpStoreOptions) -> Self {
        self.rpstore = rpstore;
        self
    }

    /// Serializes the `BlockReplication_BLRRecoveryOptions` XML document.
    pub fn recovery_options_xml(&self) -> Result<String> {
        let opts = &self.rpstore;
        let mut writer = Writer::new(Vec::new());

        let recovery_type = (self.recovery_type as u8).to_string();
        let root = BytesStart::new("BlockReplication_BLRRecoveryOptions")
            .with_attributes([("recoveryType", recovery_type.as_str())]);

        let mut attrs = vec![
            ("ccrpInterval", opts.ccrp_interval.to_string()),
            ("acrpInterval", opts.acrp_interval.to_string()),
            ("maxRpInterval", opts.max_rp_interval.to_string()),
            ("rpMergeDelay", opts.rp_merge_delay.to_string()),
            ("rpRetention", opts.rp_retention.to_string()),
            ("maxRpStoreOfflineTime", opts.max_rpstore_offline_time.to_string()),
            ("useOffPeakSchedule", u8::from(opts.merge_only_off_peak).to_string()),
        ];
        if let Some((id, name)) = &opts.rpstore {
            attrs.push(("rpStoreId", id.to_string()));
            attrs.push(("rpStoreName", name.clone()));
        }
        let granular = BytesStart::new("granularV2")
            .with_attributes(attrs.iter().map(|(k, v)| (*k, v.as_str())));

        write_xml(&mut writer, Event::Start(root))?;
        write_xml(&mut writer, Event::Empty(granular))?;
        write_xml(
            &mut writer,
            Event::End(BytesEnd::new("BlockReplication_BLRRecoveryOptions")),
        )?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::invalid_input(ErrorDomain::BlrPairs, e.to_string()))
    }
}

fn write_xml(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::invalid_input(ErrorDomain::BlrPairs, e.to_string()))
}
