//! Self-update orchestration
//!
//! The launcher checks for a newer build in the background while it does its
//! real work, then offers the update on the way out. Per run the flow is:
//!
//! 1. `start_check()` - fire-and-forget. Fetches the published version
//!    metadata, compares it against the running version and the rollout
//!    partition, and races the whole check against a timeout. Exactly one
//!    eligibility outcome is published on a oneshot channel; if the timer
//!    wins, the in-flight fetch is abandoned, not cancelled, and its late
//!    result is never read.
//! 2. `run_update()` - consumes the outcome once. If the build is eligible
//!    (or the force flag is set) it shows the release notes, asks the
//!    operator for consent, and applies the update, rolling back to the
//!    previous binary if the swap fails.
//!
//! Check failures of any kind degrade silently to "not eligible": an
//! ordinary run must never be disturbed by update plumbing.

use clx_common::console;
use clx_common::{
    Fetch, HttpFetch, PartitionOracle, Prompter, Replace, SelfReplace, StdinPrompter, User,
};
use serde::Deserialize;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time;
use tracing::{error, info};
use url::Url;

/// Metadata describing the newest published build.
///
/// This is the one wire contract the updater consumes: a JSON document with
/// `version`, `releaseNotes`, and the inclusive `startPartition` /
/// `endPartition` rollout range.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestVersionInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub release_notes: String,
    #[serde(default)]
    pub start_partition: u8,
    #[serde(default)]
    pub end_partition: u8,
}

/// What the background check produced. Defaults to "not eligible" with empty
/// metadata, which is also what a timed-out or failed check reports.
#[derive(Debug, Clone, Default)]
struct CheckOutcome {
    eligible: bool,
    latest: LatestVersionInfo,
}

/// Static configuration for one updater instance. The force flag is threaded
/// in here at construction time rather than read ambiently at decision time.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    pub binary_name: String,
    pub current_version: String,
    pub latest_version_url: String,
    pub download_root_url: String,
    pub timeout: Duration,
    pub force_self_update: bool,
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("aborted by user")]
    Aborted,

    #[error("update check was never started, or its result was already consumed")]
    CheckNotStarted,

    #[error("invalid download url {url}: {reason}")]
    BadUrl { url: String, reason: String },

    #[error("cannot download the new version from {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("update failed and the rollback did not work either: {0}\nplease contact the build-services team")]
    Fatal(String),
}

/// One-shot self-updater, one instance per process run.
///
/// `start_check()` must be called before `run_update()`, and `run_update()`
/// consumes the pending outcome: a second call gets `CheckNotStarted`.
pub struct SelfUpdater {
    config: UpdaterConfig,
    fetch: Arc<dyn Fetch>,
    partitions: Arc<dyn PartitionOracle>,
    replace: Arc<dyn Replace>,
    prompter: Box<dyn Prompter>,
    check_rx: Option<oneshot::Receiver<CheckOutcome>>,
}

impl SelfUpdater {
    /// Updater with the production collaborators: reqwest fetcher, the OS
    /// user's partition, in-place executable replacement, stdin consent.
    pub fn new(config: UpdaterConfig) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(HttpFetch::new()),
            Arc::new(User::from_env()),
            Arc::new(SelfReplace::new()),
            Box::new(StdinPrompter),
        )
    }

    pub fn with_collaborators(
        config: UpdaterConfig,
        fetch: Arc<dyn Fetch>,
        partitions: Arc<dyn PartitionOracle>,
        replace: Arc<dyn Replace>,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        Self {
            config,
            fetch,
            partitions,
            replace,
            prompter,
            check_rx: None,
        }
    }

    /// Start the eligibility check in the background. Returns immediately.
    pub fn start_check(&mut self) {
        let (tx, rx) = oneshot::channel();
        self.check_rx = Some(rx);

        let fetch = Arc::clone(&self.fetch);
        let partitions = Arc::clone(&self.partitions);
        let url = self.config.latest_version_url.clone();
        let current_version = self.config.current_version.clone();
        let deadline = self.config.timeout;

        tokio::spawn(async move {
            // The check runs as its own task and the timer only wraps its
            // join handle: an elapsed timer abandons the fetch rather than
            // cancelling it, and a late result is simply never read.
            let check = tokio::spawn(check_latest(fetch, partitions, url, current_version));
            let outcome = match time::timeout(deadline, check).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) | Err(_) => CheckOutcome::default(),
            };
            // The receiver is gone if the decision phase never ran.
            let _ = tx.send(outcome);
        });
    }

    /// Collect the check result and, if an update is on offer, walk the
    /// operator through consent and application.
    ///
    /// The common case - nothing to update - returns `Ok(())` with zero side
    /// effects.
    pub async fn run_update(&mut self) -> Result<(), UpdateError> {
        let rx = self.check_rx.take().ok_or(UpdateError::CheckNotStarted)?;
        let outcome = rx.await.unwrap_or_default();

        if !outcome.eligible && !self.config.force_self_update {
            return Ok(());
        }
        let latest = outcome.latest;

        println!("\n-----------------------------------");
        println!(
            "🚀 {} version {}",
            self.config.binary_name, self.config.current_version
        );
        println!(
            "\nan update of {} ({}) is available:\n",
            self.config.binary_name, latest.version
        );
        println!("{}", latest.release_notes);
        println!();
        console::reminder("do you want to update it? [yN]");

        // A failed read counts as a decline; never update without an
        // explicit yes.
        let reply = self.prompter.read_reply().unwrap_or_default();
        if !is_consent(&reply) {
            println!("aborted by user");
            return Err(UpdateError::Aborted);
        }

        println!(
            "update and install the latest version of {} ({})",
            self.config.binary_name, latest.version
        );
        let url = match self.latest_download_url() {
            Ok(url) => url,
            Err(err) => {
                console::error(&format!("update failed: {}", err));
                return Err(err);
            }
        };
        if let Err(err) = self.apply_update(&url).await {
            console::error(&format!("update failed: {}", err));
            return Err(err);
        }

        Ok(())
    }

    /// Download the artifact at `url` and swap it in for the running binary.
    ///
    /// A replacement failure that rolls back cleanly is a soft failure: the
    /// tool stays usable at the old version and this returns `Ok(())` after
    /// warning the operator. Only a failed rollback is fatal.
    pub async fn apply_update(&self, url: &str) -> Result<(), UpdateError> {
        let download = self
            .fetch
            .get(url)
            .await
            .map_err(|err| UpdateError::Download {
                url: url.to_string(),
                reason: format!("{err:#}"),
            })?;

        if download.status != 200 {
            return Err(UpdateError::Download {
                url: url.to_string(),
                reason: format!("code {}", download.status),
            });
        }

        if let Err(apply_err) = self.replace.apply(&download.body) {
            if let Err(rollback_err) = self.replace.rollback() {
                return Err(UpdateError::Fatal(format!(
                    "{apply_err:#}; rollback failed: {rollback_err:#}"
                )));
            }
            console::warn(&format!(
                "update failed, rolled back to the previous version: {apply_err:#}"
            ));
        }

        Ok(())
    }

    /// The platform-specific artifact URL for this binary.
    pub fn latest_download_url(&self) -> Result<String, UpdateError> {
        artifact_url(
            &self.config.download_root_url,
            env::consts::OS,
            env::consts::ARCH,
            &self.config.binary_name,
        )
    }
}

async fn check_latest(
    fetch: Arc<dyn Fetch>,
    partitions: Arc<dyn PartitionOracle>,
    url: String,
    current_version: String,
) -> CheckOutcome {
    let data = match fetch.load(&url).await {
        Ok(data) => data,
        Err(err) => {
            info!("self-update check skipped: {err:#}");
            return CheckOutcome::default();
        }
    };

    let latest: LatestVersionInfo = match serde_json::from_slice(&data) {
        Ok(latest) => latest,
        Err(err) => {
            error!("cannot parse the latest version metadata: {err}");
            return CheckOutcome::default();
        }
    };

    let eligible = latest.version != version_suffix(&current_version)
        && partitions.in_partition(latest.start_partition, latest.end_partition);

    CheckOutcome { eligible, latest }
}

/// The segment of the running version that release metadata is compared
/// against: everything after the last `-`, or the whole string if there is
/// no delimiter. `"1.2.3-abc123"` compares as `"abc123"`.
fn version_suffix(version: &str) -> &str {
    version.rsplit_once('-').map_or(version, |(_, suffix)| suffix)
}

fn is_consent(reply: &str) -> bool {
    matches!(reply.trim(), "y" | "Y")
}

/// `<root>/current/<os>/<arch>/<binary>`, with `.exe` on windows.
fn artifact_url(root: &str, os: &str, arch: &str, binary_name: &str) -> Result<String, UpdateError> {
    let mut url = Url::parse(root).map_err(|err| UpdateError::BadUrl {
        url: root.to_string(),
        reason: err.to_string(),
    })?;

    let file_name = binary_file_name(binary_name, os);
    url.path_segments_mut()
        .map_err(|_| UpdateError::BadUrl {
            url: root.to_string(),
            reason: "not a base url".to_string(),
        })?
        .pop_if_empty()
        .extend(["current", os, arch, file_name.as_str()]);

    Ok(url.to_string())
}

fn binary_file_name(name: &str, os: &str) -> String {
    if os == "windows" {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_suffix_takes_last_segment() {
        assert_eq!(version_suffix("1.2.3-abc123"), "abc123");
        assert_eq!(version_suffix("2.0.0-rc-def"), "def");
    }

    #[test]
    fn test_version_suffix_without_delimiter() {
        assert_eq!(version_suffix("abc123"), "abc123");
        assert_eq!(version_suffix(""), "");
    }

    #[test]
    fn test_consent_accepts_only_y() {
        assert!(is_consent("y"));
        assert!(is_consent("Y"));
        assert!(is_consent(" y "));
        assert!(!is_consent("yes"));
        assert!(!is_consent("n"));
        assert!(!is_consent(""));
        assert!(!is_consent("maybe"));
    }

    #[test]
    fn test_artifact_url_layout() {
        let url = artifact_url("https://downloads.example.com", "linux", "x86_64", "clx").unwrap();
        assert_eq!(url, "https://downloads.example.com/current/linux/x86_64/clx");
    }

    #[test]
    fn test_artifact_url_keeps_root_path() {
        let url = artifact_url("https://example.com/releases/", "macos", "aarch64", "clx").unwrap();
        assert_eq!(url, "https://example.com/releases/current/macos/aarch64/clx");
    }

    #[test]
    fn test_artifact_url_windows_gets_exe_suffix() {
        let url = artifact_url("https://example.com", "windows", "x86_64", "clx").unwrap();
        assert_eq!(url, "https://example.com/current/windows/x86_64/clx.exe");
    }

    #[test]
    fn test_artifact_url_rejects_garbage_root() {
        assert!(matches!(
            artifact_url("not a url", "linux", "x86_64", "clx"),
            Err(UpdateError::BadUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_dropped_check_sender_reads_as_not_eligible() {
        struct NoPrompt;
        impl Prompter for NoPrompt {
            fn read_reply(&self) -> std::io::Result<String> {
                panic!("consent prompt must not run");
            }
        }

        let mut updater = SelfUpdater::with_collaborators(
            UpdaterConfig {
                binary_name: "clx".to_string(),
                current_version: "2.0.0-abc".to_string(),
                latest_version_url: "https://downloads.example.com/version.json".to_string(),
                download_root_url: "https://downloads.example.com".to_string(),
                timeout: Duration::from_secs(5),
                force_self_update: false,
            },
            Arc::new(HttpFetch::new()),
            Arc::new(User::new("alice")),
            Arc::new(SelfReplace::new()),
            Box::new(NoPrompt),
        );

        // A check task that dies without publishing reads as not eligible.
        let (tx, rx) = oneshot::channel();
        updater.check_rx = Some(rx);
        drop(tx);

        assert!(updater.run_update().await.is_ok());
    }

    #[test]
    fn test_metadata_parses_wire_names() {
        let doc = r#"{
            "version": "abc123",
            "releaseNotes": "fixes",
            "startPartition": 10,
            "endPartition": 20
        }"#;
        let latest: LatestVersionInfo = serde_json::from_str(doc).unwrap();
        assert_eq!(latest.version, "abc123");
        assert_eq!(latest.release_notes, "fixes");
        assert_eq!(latest.start_partition, 10);
        assert_eq!(latest.end_partition, 20);
    }

    #[test]
    fn test_metadata_missing_fields_default() {
        let latest: LatestVersionInfo = serde_json::from_str(r#"{"version":"abc"}"#).unwrap();
        assert_eq!(latest.version, "abc");
        assert_eq!(latest.start_partition, 0);
        assert_eq!(latest.end_partition, 0);
    }
}
