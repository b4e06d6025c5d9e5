// Copyright (c) 2021 DDN. All rights reserved.
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file.

use ontap_facts::{
    collector::{collect, FactOp, Facts},
    module::{self, ModuleArgs},
    OntapFactsError,
};
use ontap_tracing::tracing::{self, Instrument};
use ontapi_client::Session;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "ontap-facts", about = "NetApp OnTap facts module")]
struct Opt {
    /// Path to the JSON arguments file handed over by Ansible.
    /// Arguments are read from stdin when absent.
    #[structopt(parse(from_os_str))]
    args: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();

    let args = match module::read_args(opt.args.as_deref()) {
        Ok(x) => x,
        Err(e) => module::fail_json(format!("Could not read module arguments: {}", e)),
    };

    match args.logfile.as_deref() {
        Some(path) => {
            if let Err(e) = ontap_tracing::init_logfile(path) {
                module::fail_json(format!("Could not open logfile {}: {}", path.display(), e));
            }
        }
        None => ontap_tracing::init(),
    }

    let span = tracing::info_span!("ontap_facts", host = %args.host);

    match run(&args).instrument(span).await {
        Ok(facts) => module::exit_json(facts),
        Err(e) => module::fail_json(e),
    }
}

async fn run(args: &ModuleArgs) -> Result<Facts, OntapFactsError> {
    tracing::info!("About to gather facts from host: {}", args.host);

    if args.timeout > 0 {
        tracing::debug!("The timeout parameter is accepted but not applied");
    }

    let client = ontapi_client::get_client(true)?;

    let mut session = Session::new(client, &args.host, 1, 21);

    session.set_server_type(args.na_server_type.parse()?);
    session.set_transport_type(args.na_transport_type.parse()?);
    session.set_style(args.na_style.parse()?);
    session.set_admin_user(&args.nauser, &args.napass);

    if let Some(port) = args.na_port {
        session.set_port(port);
    }

    let ops = if args.na_cluster_mode {
        FactOp::cluster_mode()
    } else {
        FactOp::filer_mode()
    };

    collect(&session, ops).await
}
