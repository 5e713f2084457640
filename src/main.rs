use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use mocap_retarget::{Config, LandmarkFrame, MemoryRig, MotionEngine};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RigBones {
    /// 体・指・表情モーフ一式
    All,
    /// 指ボーン・モーフ無し
    BodyOnly,
}

#[derive(Parser)]
#[command(name = "mocap-replay", about = "Replays a recorded landmark stream onto an in-memory MMD rig")]
struct Args {
    /// JSON Lines: 1行 = {"timestamp_ms": f64, "frame": {...}}
    recording: PathBuf,

    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[arg(long, value_enum, default_value_t = RigBones::All)]
    rig_bones: RigBones,
}

#[derive(Deserialize)]
struct RecordedFrame {
    timestamp_ms: f64,
    frame: LandmarkFrame,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = Config::load_or_default(&args.config)?;
    let mut engine = MotionEngine::new(config)?;
    let mut rig = match args.rig_bones {
        RigBones::All => MemoryRig::mmd(1),
        RigBones::BodyOnly => MemoryRig::mmd_body_only(1),
    };

    let file = File::open(&args.recording)
        .with_context(|| format!("failed to open {}", args.recording.display()))?;

    let mut frames = 0usize;
    let mut writes = 0usize;
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let recorded: RecordedFrame = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid frame", args.recording.display(), i + 1))?;
        let out = engine.update(&recorded.frame, recorded.timestamp_ms, &mut rig);
        frames += 1;
        writes += out.writes;
        log::debug!("frame {} @ {:.1}ms: {} writes", frames, recorded.timestamp_ms, out.writes);
    }

    println!("=== mocap-replay ===");
    println!("frames: {}, writes: {}", frames, writes);
    println!();
    println!("bones:");
    for (name, rotation, position) in rig.bones() {
        let (roll, pitch, yaw) = rotation.euler_angles();
        println!(
            "  {:<8} rot(deg) [{:7.2}, {:7.2}, {:7.2}]  pos [{:6.3}, {:6.3}, {:6.3}]",
            name,
            roll.to_degrees(),
            pitch.to_degrees(),
            yaw.to_degrees(),
            position.x,
            position.y,
            position.z
        );
    }
    println!();
    println!("morphs:");
    for (name, weight) in rig.morphs() {
        println!("  {:<8} {:.3}", name, weight);
    }
    Ok(())
}
