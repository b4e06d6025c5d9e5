// Copyright (c) 2021 DDN. All rights reserved.
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file.

pub mod collector;
pub mod flatten;
pub mod module;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OntapFactsError {
    #[error(transparent)]
    OntapiClient(#[from] ontapi_client::OntapiClientError),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
