use bevy::prelude::*;

use playspec::color::{resolve_color, to_bevy, DEFAULT_BACKGROUND};
use playspec::config::{load_startup_config, LaunchOptions};
use playspec::render::RenderPlugin;
use playspec::{InterpreterPlugin, PendingSpec};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let startup_config = load_startup_config();
    let options = match LaunchOptions::resolve(&args, startup_config, |key| {
        std::env::var(key).ok()
    }) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("[Playspec] {e}");
            std::process::exit(2);
        }
    };
    let spec = match options.load_spec() {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("[Playspec] {e}");
            std::process::exit(1);
        }
    };

    let mut app = App::new();

    if options.headless {
        // Headless mode: no window, no rendering, just the interpreter
        app.add_plugins(MinimalPlugins);
        println!("[Playspec] Starting in HEADLESS mode");
    } else {
        if options.assets_dir != playspec::config::DEFAULT_ASSETS_DIR {
            println!("[Playspec] Using game assets dir: {}", options.assets_dir);
        }
        let mut plugins = DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: spec.title.clone(),
                    resolution: (spec.game.width as f32, spec.game.height as f32).into(),
                    present_mode: bevy::window::PresentMode::AutoVsync,
                    ..default()
                }),
                ..default()
            })
            .set(bevy::asset::AssetPlugin {
                file_path: options.assets_dir.clone(),
                ..default()
            });
        if options.nearest_filter {
            plugins = plugins.set(bevy::render::texture::ImagePlugin::default_nearest());
            println!("[Playspec] Texture filter: nearest (pixel-art mode)");
        }
        app.add_plugins(plugins);
        let background = resolve_color(Some(&spec.game.background_color), DEFAULT_BACKGROUND);
        app.insert_resource(ClearColor(to_bevy(background)));
        app.add_plugins(RenderPlugin);
        println!("[Playspec] Starting in WINDOWED mode");
    }

    app.insert_resource(Time::<Fixed>::from_hz(60.0))
        .add_plugins(InterpreterPlugin);

    #[cfg(not(target_arch = "wasm32"))]
    {
        if options.watch {
            app.add_plugins(playspec::file_watcher::FileWatcherPlugin {
                spec_path: options.spec_path.clone(),
                options: options.start_options(),
            });
        }
        if options.api {
            app.add_plugins(playspec::api::ApiPlugin {
                addr: options.api_addr.clone(),
            });
        }
    }

    app.insert_resource(PendingSpec {
        spec,
        options: options.start_options(),
    });
    app.run();
}
