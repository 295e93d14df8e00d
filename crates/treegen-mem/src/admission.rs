//! Pre-flight admission control.
//!
//! Peak memory is modelled as `2^(n/3)` MiB: tree counts grow roughly
//! threefold per node (A000081), and the cache plus result buckets grow with
//! them. The model is only consulted for large requests; below
//! `check_from` everything is admitted.

use serde::Serialize;

use treegen_core::config::GeneratorConfig;
use treegen_core::error::{Error, Result};

use crate::sys::SystemResources;

const MIB: u64 = 1024 * 1024;

/// Estimated peak bytes for an `n`-node enumeration.
pub fn estimate_bytes(n: usize) -> u64 {
    let shift = (n / 3).min(43) as u32;
    (1u64 << shift).saturating_mul(MIB)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Admission {
    Admitted,
    /// Proceeding, but the estimate exceeds half of available memory.
    Warned {
        estimated_bytes: u64,
        available_bytes: u64,
    },
    Rejected { reason: String },
}

impl Admission {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Admission::Rejected { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    /// Absolute ceiling on N.
    pub max_nodes: usize,
    /// First N at which the memory model is consulted.
    pub check_from: usize,
}

impl AdmissionPolicy {
    pub fn from_config(cfg: &GeneratorConfig) -> Self {
        Self {
            max_nodes: cfg.max_nodes,
            check_from: cfg.admission_check_from,
        }
    }

    /// Pure decision; `available` is `None` when memory could not be detected.
    pub fn evaluate(&self, n: usize, available: Option<u64>) -> Admission {
        if n > self.max_nodes {
            return Admission::Rejected {
                reason: format!(
                    "N={} is too large; maximum supported is N={}",
                    n, self.max_nodes
                ),
            };
        }
        if n < self.check_from {
            return Admission::Admitted;
        }
        let Some(available) = available else {
            return Admission::Admitted;
        };

        let estimated = estimate_bytes(n);
        if estimated > available {
            return Admission::Rejected {
                reason: format!(
                    "estimated requirement ~{} MiB exceeds available ~{} MiB",
                    estimated / MIB,
                    available / MIB
                ),
            };
        }
        if estimated.saturating_mul(2) > available {
            return Admission::Warned {
                estimated_bytes: estimated,
                available_bytes: available,
            };
        }
        Admission::Admitted
    }
}

/// Evaluate, log, and turn a rejection into `Error::Rejected`.
pub fn admit(
    cfg: &GeneratorConfig,
    n: usize,
    m: usize,
    resources: &SystemResources,
) -> Result<Admission> {
    let outcome = AdmissionPolicy::from_config(cfg).evaluate(n, resources.available_bytes);
    match &outcome {
        Admission::Admitted => {
            tracing::debug!(n, m, "admitted");
        }
        Admission::Warned {
            estimated_bytes,
            available_bytes,
        } => {
            tracing::warn!(
                n,
                m,
                estimated_mib = estimated_bytes / MIB,
                available_mib = available_bytes / MIB,
                "request may use significant memory; proceeding"
            );
        }
        Admission::Rejected { reason } => {
            tracing::warn!(n, m, %reason, "request rejected by admission control");
            return Err(Error::Rejected {
                n,
                m,
                reason: reason.clone(),
            });
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AdmissionPolicy {
        AdmissionPolicy::from_config(&GeneratorConfig::default())
    }

    #[test]
    fn model_doubles_every_three_nodes() {
        assert_eq!(estimate_bytes(25), 256 * MIB);
        assert_eq!(estimate_bytes(27), 512 * MIB);
        assert_eq!(estimate_bytes(30), 1024 * MIB);
    }

    #[test]
    fn small_requests_are_always_admitted() {
        assert_eq!(policy().evaluate(14, Some(1)), Admission::Admitted);
        assert_eq!(policy().evaluate(0, Some(0)), Admission::Admitted);
    }

    #[test]
    fn ceiling_rejects_regardless_of_memory() {
        assert!(policy().evaluate(31, None).is_rejected());
        assert!(policy().evaluate(31, Some(u64::MAX)).is_rejected());
    }

    #[test]
    fn large_requests_compare_against_available() {
        let p = policy();
        assert!(p.evaluate(25, Some(100 * MIB)).is_rejected());
        assert_eq!(
            p.evaluate(25, Some(400 * MIB)),
            Admission::Warned {
                estimated_bytes: 256 * MIB,
                available_bytes: 400 * MIB
            }
        );
        assert_eq!(p.evaluate(25, Some(4096 * MIB)), Admission::Admitted);
        // Unknown memory admits.
        assert_eq!(p.evaluate(30, None), Admission::Admitted);
    }

    #[test]
    fn admit_maps_rejection_to_error() {
        let cfg = GeneratorConfig::default();
        let tight = SystemResources::fixed(2, Some(MIB), Some(MIB));
        let err = admit(&cfg, 27, 3, &tight).unwrap_err();
        assert!(err.is_rejection());
        let ok = admit(&cfg, 8, 5, &tight).unwrap();
        assert_eq!(ok, Admission::Admitted);
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_string(&Admission::Admitted).unwrap();
        assert_eq!(json, r#"{"outcome":"admitted"}"#);
    }
}
