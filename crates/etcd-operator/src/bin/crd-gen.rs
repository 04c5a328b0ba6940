//! Print the EtcdCluster CRD as YAML.

use kube::CustomResourceExt;

use etcd_operator::crds::EtcdCluster;

fn main() -> anyhow::Result<()> {
    let crd = EtcdCluster::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
