//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The Mudlark server binary.

use clap::Parser;
use mudlark_server::{
    BcryptCredentials, BuiltinDispatcher, MemoryAccounts, Reactor, Result, ServerConfig,
    SessionContext, states,
};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "mudlark-server", about = "Mudlark multi-user telnet server")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "MUDLARK_BIND", default_value = "0.0.0.0:4000")]
    bind: SocketAddr,

    /// Maximum simultaneous connections
    #[arg(long, env = "MUDLARK_MAX_CONNECTIONS", default_value_t = 256)]
    max_connections: usize,

    /// Reactor poll timeout in milliseconds (0 waits for readiness alone)
    #[arg(long, env = "MUDLARK_POLL_MS", default_value_t = 250)]
    poll_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let config = ServerConfig::new(args.bind)
        .with_max_connections(args.max_connections)
        .with_poll_timeout(if args.poll_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(args.poll_ms))
        });

    let context = SessionContext::new(
        states::standard_registry()?,
        Box::new(MemoryAccounts::new()),
        Box::new(BcryptCredentials),
        Box::new(BuiltinDispatcher),
    );

    let mut reactor = Reactor::bind(config, context).await?;
    info!(addr = %reactor.local_addr(), "mudlark is listening");

    tokio::select! {
        result = reactor.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received");
        }
    }
    reactor.shutdown();
    Ok(())
}
