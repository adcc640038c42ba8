//! Redis cluster helper (spec §4.5.1): an illustrative composite subsystem
//! built entirely on top of [`ContainerAdapter`] and [`argv`] -- no separate
//! Redis client, just container lifecycles plus `redis-cli` invocations
//! inside one member for cluster bring-up.

use xec_core::{ContainerCliConfig, EphemeralContainerSpec, ExecResult, XecError};

use crate::adapter::ContainerAdapter;
use crate::ephemeral::generate_name;

const BASE_PORT: u16 = 7000;

#[derive(Debug, Clone)]
pub struct RedisClusterConfig {
    pub masters: u32,
    pub replicas: u32,
    pub image: String,
    pub network: String,
    pub cli: ContainerCliConfig,
}

impl Default for RedisClusterConfig {
    fn default() -> Self {
        Self {
            masters: 3,
            replicas: 0,
            image: "redis:7".to_string(),
            network: "xec-redis-cluster".to_string(),
            cli: ContainerCliConfig::default(),
        }
    }
}

/// A running (or partially-running) cluster. `remove` tears down every
/// member it created regardless of which ones are still alive.
pub struct RedisCluster {
    adapter: ContainerAdapter,
    cli: ContainerCliConfig,
    members: Vec<String>,
    base_port: u16,
}

impl RedisCluster {
    /// Validates `masters >= 3` (spec §4.5.1), then brings up
    /// `masters + masters*replicas` containers on a shared bridge network
    /// with predictable names and base-port-offset mappings, and runs
    /// `redis-cli --cluster create` inside the first member. Any failure
    /// during bring-up triggers a best-effort teardown of everything
    /// created so far before the error is surfaced.
    pub async fn create(config: RedisClusterConfig) -> Result<Self, XecError> {
        if config.masters < 3 {
            return Err(XecError::Internal(
                "redis cluster requires at least 3 masters".to_string(),
            ));
        }

        let adapter = ContainerAdapter::new();
        let _ = adapter
            .run_cli(&config.cli, vec!["network".into(), "create".into(), config.network.clone()])
            .await; // idempotent: ignore "already exists"

        let total = config.masters + config.masters * config.replicas;
        let mut members = Vec::with_capacity(total as usize);
        let mut cluster = Self {
            adapter,
            cli: config.cli.clone(),
            members: Vec::new(),
            base_port: BASE_PORT,
        };

        for i in 0..total {
            let port = BASE_PORT + i as u16;
            let name = generate_name("xec-redis");
            let mut spec = EphemeralContainerSpec {
                network: Some(config.network.clone()),
                published_ports: vec![(port, 6379)],
                command: Some(vec![
                    "redis-server".into(),
                    "--port".into(),
                    "6379".into(),
                    "--cluster-enabled".into(),
                    "yes".into(),
                ]),
                ..Default::default()
            };
            spec.name = Some(name.clone());

            if let Err(e) = cluster.start_member(&config.image, &spec).await {
                cluster.members = members;
                let _ = cluster.remove().await;
                return Err(e);
            }
            members.push(name);
        }
        cluster.members = members;

        if let Err(e) = cluster.init_cluster(&config).await {
            let _ = cluster.remove().await;
            return Err(e);
        }

        Ok(cluster)
    }

    async fn start_member(&self, image: &str, spec: &EphemeralContainerSpec) -> Result<(), XecError> {
        let name = spec.name.clone().unwrap();
        let args = crate::argv::run_detached_args(&name, image, spec);
        self.adapter.run_cli(&self.cli, args).await.map(|_| ())
    }

    async fn init_cluster(&self, config: &RedisClusterConfig) -> Result<(), XecError> {
        let endpoints: Vec<String> = self
            .members
            .iter()
            .enumerate()
            .map(|(i, _)| format!("127.0.0.1:{}", self.base_port + i as u16))
            .collect();
        let mut args = vec!["redis-cli".to_string(), "--cluster".into(), "create".into()];
        args.extend(endpoints);
        args.push("--cluster-replicas".into());
        args.push(config.replicas.to_string());
        args.push("--cluster-yes".into());

        let first = self.members.first().ok_or_else(|| {
            XecError::Internal("redis cluster has no members to initialize from".to_string())
        })?;
        let exec_args = {
            let mut v = vec!["exec".to_string(), first.clone()];
            v.extend(args);
            v
        };
        self.adapter.run_cli(&self.cli, exec_args).await.map(|_| ())
    }

    pub async fn exec(&self, command: &str) -> Result<ExecResult, XecError> {
        let first = self.members.first().ok_or_else(|| {
            XecError::Internal("redis cluster has no members".to_string())
        })?;
        self.adapter
            .run_cli(
                &self.cli,
                vec!["exec".into(), first.clone(), "redis-cli".into(), "-c".into(), command.into()],
            )
            .await
    }

    pub async fn info(&self) -> Result<ExecResult, XecError> {
        self.exec("CLUSTER INFO").await
    }

    pub async fn nodes(&self) -> Result<ExecResult, XecError> {
        self.exec("CLUSTER NODES").await
    }

    pub fn connection_string(&self) -> String {
        self.members
            .iter()
            .enumerate()
            .map(|(i, _)| format!("127.0.0.1:{}", self.base_port + i as u16))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub async fn is_running(&self) -> bool {
        for member in &self.members {
            match self.adapter.inspect(&self.cli, member).await {
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
        !self.members.is_empty()
    }

    pub async fn remove(&self) -> Result<(), XecError> {
        let mut first_error = None;
        for member in &self.members {
            if let Err(e) = self.adapter.remove_named(&self.cli, member).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
