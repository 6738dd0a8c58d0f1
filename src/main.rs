// src/main.rs
mod config;
mod drivers;
mod engine;
mod recorder;
mod types;
mod viewer;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::Sender;
use config::{PipelineConfig, SourceKind};
use drivers::{
    available_ports, latest_slot, open_serial, DisplayBuffer, Downsampler, PacketDecoder,
    SimulatedInstrument,
};
use engine::{spawn_acquisition, AcquisitionLoop};
use recorder::SampleLog;
use std::io::{BufRead, Read};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use viewer::{DisplayContext, LogRenderer, ViewerCommand};
fn load_config() -> Result<PipelineConfig> {
    match std::env::args_os().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            PipelineConfig::load(&path)
                .with_context(|| format!("loading configuration from {}", path.display()))
        }
        None => {
            let config = PipelineConfig::default();
            config.validate().context("validating default configuration")?;
            Ok(config)
        }
    }
}
// 控制台指令: 输入 q 结束采集
fn spawn_console(commands: Sender<ViewerCommand>) -> std::io::Result<()> {
    thread::Builder::new().name("console".to_owned()).spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if matches!(line.trim(), "q" | "quit") {
                let _ = commands.send(ViewerCommand::Stop);
                break;
            }
        }
    })?;
    Ok(())
}
// 入口函数
fn main() -> Result<()> {
    env_logger::init();
    let config = load_config()?;
    let names = config.channel_names();
    // 1. 采集线程的各个部件
    let decoder = PacketDecoder::new(names.len());
    let log = SampleLog::from_config(&config).context("opening sample log")?;
    let scheduler = Downsampler::new(
        config.update_rate_ms,
        config.sensor_rate_ms,
        config.device_timestamps(),
    );
    let (tx, rx) = latest_slot();
    // 2. 打开数据源并启动后台线程
    let stream: Box<dyn Read + Send> = match config.source {
        SourceKind::Serial => {
            let port = open_serial(&config.port, config.baud_rate, config.read_timeout())
                .map_err(|err| {
                    log::error!("available ports: {:?}", available_ports());
                    err
                })
                .context("opening instrument transport")?;
            Box::new(port)
        }
        SourceKind::Simulated => {
            let rate = config.sensor_rate_ms as u32;
            let mut sim = SimulatedInstrument::new(names.len(), rate).paced();
            if let Some(packets) = config.simulated_packets {
                sim = sim.with_limit(packets);
            }
            Box::new(sim)
        }
    };
    let acquisition = AcquisitionLoop::new(stream, decoder, log, scheduler, tx)
        .with_malformed_limit(config.max_malformed_retries);
    let shutdown = acquisition.shutdown_handle();
    let stats = acquisition.stats();
    let handle = spawn_acquisition(acquisition)?;
    // 3. 停止指令: 控制台 q, 或者到达设定的运行时长
    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    spawn_console(cmd_tx.clone())?;
    if let Some(limit) = config.run_for() {
        thread::spawn(move || {
            thread::sleep(limit);
            let _ = cmd_tx.send(ViewerCommand::Stop);
        });
    } else {
        drop(cmd_tx);
    }
    log::info!("type q + Enter to stop");
    // 4. 显示线程 (当前线程) 跑事件循环, 直到采集结束
    let display = DisplayContext::new(
        DisplayBuffer::new(names, config.max_size),
        rx,
        Duration::from_millis(config.update_rate_ms),
    )
    .with_controls(shutdown, cmd_rx);
    let mut renderer = LogRenderer::new((1000 / config.update_rate_ms).max(1)).with_stats(stats);
    display.run(&mut renderer);
    let report = handle
        .join()
        .map_err(|_| anyhow!("acquisition thread panicked"))?
        .context("acquisition loop")?;
    log::info!("done ({:?}): {:?}", report.reason, report.stats);
    Ok(())
}
