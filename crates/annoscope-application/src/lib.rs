//! Application layer for Annoscope.
//!
//! Services that combine the compatibility rules with the repositories:
//! eligibility queries, batch membership changes and run provisioning.

mod lookup;

pub mod eligibility;
pub mod membership;
pub mod provisioning;

pub use eligibility::EligibilityService;
pub use membership::{BatchResult, CollectionMembershipService, MergeResult, SourceIds};
pub use provisioning::{ProvisionResult, RunProvisioningService};
