//! Base-image command - load or store cached base images

use crate::cli::args::{BaseImageArgs, BaseImageOp, BaseImageToolchain};
use crate::config::Config;
use crate::error::ToolsmithResult;
use crate::image;
use crate::orchestration::create_runtime;
use crate::toolchain::BaseImageSet;
use crate::ui::{self, UiContext};

/// Execute the base-image command
pub async fn execute(args: BaseImageArgs, config: &Config) -> ToolsmithResult<()> {
    let ctx = UiContext::detect();
    let runtime = create_runtime(&config.engine).await?;
    let set = image_set(args.toolchain);

    match args.op {
        BaseImageOp::Store => {
            let saved = image::store(
                runtime.as_ref(),
                set,
                &config.paths.build_root,
                &args.cache_path,
                &ctx,
            )
            .await?;
            for path in saved {
                ui::step_ok_detail(&ctx, "Saved", &path.display().to_string());
            }
        }
        BaseImageOp::Load => {
            let loaded = image::load(runtime.as_ref(), set, &args.cache_path).await?;
            for tag in loaded {
                ui::step_ok(&ctx, &format!("Loaded {}", tag));
            }
        }
    }

    Ok(())
}

fn image_set(toolchain: BaseImageToolchain) -> BaseImageSet {
    match toolchain {
        BaseImageToolchain::Sysroot => BaseImageSet::Sysroot,
        BaseImageToolchain::Gcc => BaseImageSet::Gcc,
        BaseImageToolchain::Clang => BaseImageSet::Clang,
    }
}
