// Copyright (c) 2021 DDN. All rights reserved.
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file.

use crate::{flatten, OntapFactsError};
use ontap_tracing::tracing;
use ontapi_client::Invoke;

/// The accumulated fact mapping, keyed by fact-group name.
pub type Facts = serde_json::Map<String, serde_json::Value>;

/// One remote inventory operation and the fact group it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactOp {
    Version,
    ClusterIdentity,
    NodeInfo,
    SvmInfo,
    AggrInfo,
}

impl FactOp {
    pub fn api_name(self) -> &'static str {
        match self {
            Self::Version => "system-get-version",
            Self::ClusterIdentity => "cluster-identity-get",
            Self::NodeInfo => "system-get-node-info-iter",
            Self::SvmInfo => "vserver-get-iter",
            Self::AggrInfo => "aggr-get-iter",
        }
    }

    pub fn fact_group(self) -> &'static str {
        match self {
            Self::Version => "cluster_version_info",
            Self::ClusterIdentity => "cluster_identity",
            Self::NodeInfo => "system_node_info",
            Self::SvmInfo => "svm_info",
            Self::AggrInfo => "aggr_info",
        }
    }

    /// The operation set for a clustered OnTap target.
    pub fn cluster_mode() -> &'static [Self] {
        &[
            Self::Version,
            Self::ClusterIdentity,
            Self::NodeInfo,
            Self::SvmInfo,
            Self::AggrInfo,
        ]
    }

    /// The operation set for a filer-oriented target, which has no cluster
    /// identity to report.
    pub fn filer_mode() -> &'static [Self] {
        &[Self::Version, Self::NodeInfo, Self::SvmInfo, Self::AggrInfo]
    }
}

/// Run the enabled operations strictly in order and assemble the combined
/// fact mapping.
///
/// The first failed call aborts the run with the vendor errno and reason;
/// facts gathered by earlier calls are discarded, so the caller never
/// observes a partial mapping.
pub async fn collect<I: Invoke>(session: &I, ops: &[FactOp]) -> Result<Facts, OntapFactsError> {
    let mut facts = Facts::new();

    for op in ops.iter().copied() {
        tracing::info!("Invoking {}", op.api_name());

        let tree = session.invoke(op.api_name()).await?.into_result()?;

        let group = match op {
            FactOp::Version => flatten::version_info(&tree),
            FactOp::ClusterIdentity => {
                flatten::keyed_records(&tree, "attributes", "cluster-name")
            }
            FactOp::NodeInfo => flatten::keyed_records(&tree, "attributes-list", "system-name"),
            FactOp::SvmInfo => flatten::keyed_records(&tree, "attributes-list", "vserver-name"),
            FactOp::AggrInfo => {
                flatten::keyed_records(&tree, "attributes-list", "aggregate-name")
            }
        };

        facts.insert(op.fact_group().to_string(), group);
    }

    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ontapi_client::{resp, resp::CallResult, OntapiClientError};
    use serde_json::json;
    use std::{cell::RefCell, collections::VecDeque};

    static VERSION: &str = include_str!("../fixtures/version.xml");
    static IDENTITY: &str = include_str!("../fixtures/identity.xml");
    static NODES: &str = include_str!("../fixtures/nodes.xml");
    static SVMS: &str = include_str!("../fixtures/svms.xml");
    static AGGRS: &str = include_str!("../fixtures/aggrs.xml");
    static EMPTY_LIST: &str = include_str!("../fixtures/empty_list.xml");
    static FAILED: &str = include_str!("../fixtures/failed.xml");

    #[derive(Debug)]
    struct Scripted {
        responses: RefCell<VecDeque<CallResult>>,
        calls: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn new(xs: &[&str]) -> Self {
            Self {
                responses: RefCell::new(
                    xs.iter().map(|x| resp::parse_call(x).unwrap()).collect(),
                ),
                calls: RefCell::new(vec![]),
            }
        }
    }

    #[async_trait(?Send)]
    impl Invoke for Scripted {
        async fn invoke(&self, op: &str) -> Result<CallResult, OntapiClientError> {
            self.calls.borrow_mut().push(op.to_string());

            Ok(self
                .responses
                .borrow_mut()
                .pop_front()
                .expect("ran out of scripted responses"))
        }
    }

    #[tokio::test]
    async fn test_cluster_mode_collects_all_groups_in_order() {
        let s = Scripted::new(&[VERSION, IDENTITY, NODES, SVMS, AGGRS]);

        let facts = collect(&s, FactOp::cluster_mode()).await.unwrap();

        assert_eq!(
            *s.calls.borrow(),
            [
                "system-get-version",
                "cluster-identity-get",
                "system-get-node-info-iter",
                "vserver-get-iter",
                "aggr-get-iter"
            ]
        );

        let mut groups: Vec<_> = facts.keys().map(String::as_str).collect();
        groups.sort_unstable();

        assert_eq!(
            groups,
            [
                "aggr_info",
                "cluster_identity",
                "cluster_version_info",
                "svm_info",
                "system_node_info"
            ]
        );

        assert_eq!(facts["cluster_version_info"]["version"], json!("9.1"));
        assert_eq!(
            facts["cluster_identity"]["cluster1"]["cluster-serial-number"],
            json!("1-80-000011")
        );
        assert_eq!(
            facts["system_node_info"]["cluster1-01"]["system-model"],
            json!("SIMBOX")
        );
        assert_eq!(facts["svm_info"]["svm2"]["state"], json!("stopped"));
        assert_eq!(
            facts["aggr_info"]["aggr1_data"]["aggr-raid-attributes"]["disk-count"],
            json!("8")
        );
    }

    #[tokio::test]
    async fn test_filer_mode_omits_cluster_identity() {
        let s = Scripted::new(&[VERSION, NODES, SVMS, AGGRS]);

        let facts = collect(&s, FactOp::filer_mode()).await.unwrap();

        assert_eq!(s.calls.borrow().len(), 4);
        assert!(!facts.contains_key("cluster_identity"));
        assert!(facts.contains_key("system_node_info"));
    }

    #[tokio::test]
    async fn test_failure_aborts_and_discards_prior_facts() {
        let s = Scripted::new(&[VERSION, FAILED]);

        let err = collect(&s, FactOp::cluster_mode()).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "errno: 13005, reason: Unable to find API: cluster-identity-get"
        );
        // The failed call is the last one issued.
        assert_eq!(s.calls.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_on_first_operation_yields_no_facts() {
        let s = Scripted::new(&[FAILED]);

        let err = collect(&s, FactOp::cluster_mode()).await.unwrap_err();

        assert!(err.to_string().contains("errno: 13005"));
        assert_eq!(s.calls.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_list_yields_empty_group() {
        let s = Scripted::new(&[VERSION, IDENTITY, EMPTY_LIST, SVMS, AGGRS]);

        let facts = collect(&s, FactOp::cluster_mode()).await.unwrap();

        assert_eq!(facts["system_node_info"], json!({}));
    }
}
