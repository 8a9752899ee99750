// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Fatal search errors.
//!
//! Everything here ends the whole search; per-attempt failures (infeasible
//! midpoint, scratch exhaustion, timeout) are ordinary protocol outcomes and
//! never surface as errors.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::machine::InstallError;

#[derive(Debug, Error)]
pub enum FatalError {
    /// Even the unfiltered baseline table (midpoint 0) does not fit the
    /// router. No amount of filter folding can fix that.
    #[error("baseline routing table does not fit the router capacity")]
    BaselineInfeasible,

    /// The router rejected the final minimised table at install time.
    #[error("router rejected the compressed table: {0}")]
    RouterRejected(#[from] InstallError),

    /// The filter regions do not agree with the routing table.
    #[error("catalog construction failed: {0}")]
    CatalogBuild(#[from] CatalogError),

    /// No worker could be registered or every worker was lost before a
    /// verdict on the baseline arrived.
    #[error("no usable compression workers")]
    NoWorkers,

    /// All workers retired without any midpoint succeeding.
    #[error("search ended without a feasible midpoint")]
    NoResult,
}

impl FatalError {
    /// Process exit code for the command-line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::BaselineInfeasible => 2,
            FatalError::RouterRejected(_) => 3,
            FatalError::CatalogBuild(_) => 4,
            FatalError::NoWorkers => 5,
            FatalError::NoResult => 6,
        }
    }
}
