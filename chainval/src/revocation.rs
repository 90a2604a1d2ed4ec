//! Revocation status determination
//!
//! Revocation checking is a collaborator of the chain builder: any number of
//! [`RevocationStatusProvider`](crate::RevocationStatusProvider) implementations may be registered
//! with a [`ChainEnvironment`](crate::ChainEnvironment). Providers are prepared for the leaf and,
//! depending on the [`RevocationFlag`](crate::RevocationFlag), for the other candidates before a
//! path is constructed. They are then queried for each element in the flag's scope.
//!
//! [`CrlCache`](crate::CrlCache) is a provider backed by CRLs that are added programmatically or,
//! in [`RevocationMode::Online`](crate::RevocationMode::Online), fetched from `http` CRL
//! distribution points.
//!
//! ```
//! use chainval::*;
//!
//! let mut env = ChainEnvironment::default();
//! populate_default_chain_environment(&mut env);
//! env.add_revocation_provider(Box::new(CrlCache::new()));
//! ```

pub mod crl_cache;

pub use crate::revocation::crl_cache::*;
