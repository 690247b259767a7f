//! Cluster-info command

use charter_kube::ClusterClient;

use super::Context;
use crate::error::Result;

pub fn run(ctx: &Context) -> Result<()> {
    let info = ctx.kubectl.cluster_info()?;
    println!("{}", info);
    Ok(())
}
