use anyhow::{Context, Result};
use clap::Parser;
use flux_config::ConfigLoader;
use flux_discovery::{build_picker, RoutingKey};
use flux_event::{
    EventProcessor, EventProcessorContext, MultiStateTransition, StateChangeHandler,
    TracingStateChangeHandler,
};
use flux_types::{EventEngineTask, EventProcessorInput, TaskState};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 标签选择器中资源 id 的标签名
const RESOURCE_LABEL: &str = "resource_id";

/// 把采样文件回放到一个事件任务，输出总体状态变化
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config directory containing event-engine.toml
    #[arg(short, long, default_value = "config")]
    config_dir: PathBuf,

    /// Task definition (.json or .toml)
    #[arg(short, long)]
    task: PathBuf,

    /// Samples, one JSON object per line
    #[arg(short, long)]
    samples: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let loader = ConfigLoader::new(&args.config_dir);
    let config = loader.load()?;
    info!(name = %config.system.name, version = %config.system.version, "Loaded configuration");

    let task = loader.load_task(&args.task)?;
    log_route(&config.discovery, &task).await;

    let mut ctx = EventProcessorContext::from_task(task)?;
    let processor = EventProcessor::new();
    let mut tracing_handler = TracingStateChangeHandler;
    let mut handler = |transition: &MultiStateTransition<TaskState, String>, message: Option<&str>| {
        tracing_handler.handle_state_change(transition, message);
        let from = transition
            .overall
            .from
            .map_or_else(|| "null".to_string(), |s| s.to_string());
        println!("{} -> {}: {}", from, transition.overall.to, message.unwrap_or("-"));
    };

    let file = File::open(&args.samples)
        .with_context(|| format!("Failed to open samples {}", args.samples.display()))?;

    let mut processed = 0usize;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let input: EventProcessorInput = serde_json::from_str(&line)
            .with_context(|| format!("Invalid sample on line {}", index + 1))?;

        if let Err(e) = processor.process(&mut ctx, input, &mut handler) {
            warn!(line = index + 1, "Failed to process sample: {}", e);
            continue;
        }
        processed += 1;
    }

    info!(
        processed,
        overall = ?ctx.overall_state(),
        zones = ?ctx.zone_states(),
        "Replay finished"
    );
    Ok(())
}

/// 记录该任务会被路由到的引擎实例
async fn log_route(discovery: &flux_discovery::DiscoveryProperties, task: &EventEngineTask) {
    let picker = match build_picker(discovery).await {
        Ok(picker) => picker,
        Err(e) => {
            warn!("Engine routing unavailable: {}", e);
            return;
        }
    };

    let params = &task.task_parameters;
    let key = RoutingKey::new(
        task.tenant_id.clone(),
        params
            .label_selector
            .get(RESOURCE_LABEL)
            .cloned()
            .unwrap_or_default(),
        params.metric_group.clone(),
    );

    match picker.pick_recipient(&key).await {
        Ok(instance) => info!(task_id = %task.id, instance = %instance, "Task routed to engine instance"),
        Err(e) => warn!(task_id = %task.id, "Failed to pick engine instance: {}", e),
    }
}
