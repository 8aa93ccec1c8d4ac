//! A small pipeline for a cargo project.
//!
//! ```text
//! cargo run --example pipeline -- release --verbose
//! cargo run --example pipeline -- test -- --nocapture
//! ```

use std::process::ExitCode;

use camino::Utf8PathBuf;
use highway::{Registry, Settings};
use highway::tools::{Invocable, LocalSystem, System};

highway::highways! {
    enum Lane {
        Clean => "clean",
        Build => "build",
        Test => "test",
        Archive => "archive",
        Release => "release",
    }
}

/// What the highways of this pipeline hand to each other.
#[derive(Debug, Clone)]
enum Artifact {
    Binary(Utf8PathBuf),
    Archive(Utf8PathBuf),
}

fn pipeline(system: LocalSystem) -> Result<Registry<Lane, Artifact>, highway::HighwayError> {
    let mut registry = Registry::new();

    registry
        .register(Lane::Clean, Some("Removes build output"))?
        .run(move |_| -> anyhow::Result<Option<Artifact>> {
            system.execute(&Invocable::new("cargo").arg("clean"))?;
            Ok(None)
        });

    registry
        .register(Lane::Build, Some("Builds the release binary"))?
        .run(move |ctx| -> anyhow::Result<Artifact> {
            let command = Invocable::new("cargo")
                .args(["build", "--release"])
                .args(ctx.arguments().iter().cloned());
            system.execute(&command)?;

            let name = env!("CARGO_PKG_NAME");
            Ok(Artifact::Binary(Utf8PathBuf::from("target/release").join(name)))
        });

    registry
        .register(Lane::Test, Some("Runs the test suite"))?
        .run(move |ctx| -> anyhow::Result<Option<Artifact>> {
            let mut command = Invocable::new("cargo").arg("test");
            if !ctx.arguments().is_empty() {
                command = command.arg("--").args(ctx.arguments().iter().cloned());
            }
            system.execute(&command)?;
            Ok(None)
        });

    registry
        .register(Lane::Archive, Some("Packs the binary into a tarball"))?
        .depends([Lane::Build])
        .run(move |ctx| -> anyhow::Result<Artifact> {
            let Some(Artifact::Binary(binary)) = ctx.result(Lane::Build) else {
                anyhow::bail!("build produced no binary");
            };

            let archive = Utf8PathBuf::from("target/release.tar.gz");
            system.execute(
                &Invocable::new("tar")
                    .arg("-czf")
                    .arg(archive.as_str())
                    .arg(binary.as_str()),
            )?;

            ctx.ui.success(&format!("Packed {binary} into {archive}"));
            Ok(Artifact::Archive(archive))
        });

    registry
        .register(Lane::Release, Some("Tests, builds and archives"))?
        .depends([Lane::Test, Lane::Archive])
        .run(|ctx| -> anyhow::Result<Option<Artifact>> {
            if let Some(Artifact::Archive(path)) = ctx.result(Lane::Archive) {
                ctx.ui.success(&format!("Release ready at {path}"));
            }
            Ok(None)
        });

    Ok(registry)
}

fn main() -> ExitCode {
    match pipeline(LocalSystem) {
        Ok(registry) => registry
            .finish()
            .with_settings(Settings::from_env().version(env!("CARGO_PKG_VERSION")))
            .go(),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
