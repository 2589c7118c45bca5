use gpui::*;
use gpui_component::{Root, ThemeRegistry};

use charla::app::{APP_TITLE, ChatAppShell, Quit, default_themes_path};
use charla::settings::SettingsStore;

fn main() {
    tracing_subscriber::fmt::init();

    let settings_store = SettingsStore::load();
    tracing::info!(
        path = ?settings_store.config_path(),
        server_url = %settings_store.settings().server_url,
        history_url = %settings_store.settings().history_url,
        "settings resolved"
    );
    let settings = settings_store.settings().clone();

    let app = Application::new().with_assets(gpui_component_assets::Assets);

    app.run(move |cx| {
        gpui_tokio_bridge::init(cx);

        // Must run before any Root is created.
        gpui_component::init(cx);

        // A missing ./themes directory only means built-in themes.
        let theme_settings = settings.clone();
        if let Err(err) = ThemeRegistry::watch_dir(default_themes_path(), cx, move |cx| {
            theme_settings.apply_theme(None, cx);
            tracing::info!("Theme directory watch initialized");
        }) {
            tracing::warn!(
                "Failed to watch themes directory: {}. Using default themes.",
                err
            );
            settings.apply_theme(None, cx);
        }

        cx.on_action(|_: &Quit, cx| {
            cx.quit();
        });

        cx.bind_keys([KeyBinding::new("cmd-q", Quit, None)]);

        cx.spawn(async move |cx| {
            cx.update(|cx| {
                let options = WindowOptions {
                    window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
                        None,
                        size(px(720.), px(780.)),
                        cx,
                    ))),
                    titlebar: Some(TitlebarOptions {
                        title: Some(APP_TITLE.into()),
                        ..Default::default()
                    }),
                    ..Default::default()
                };

                let opened = cx.open_window(options, |window, cx| {
                    let shell = cx.new(|cx| ChatAppShell::new(settings, window, cx));
                    cx.new(|cx| Root::new(shell, window, cx))
                });

                match opened {
                    Ok(_) => cx.activate(true),
                    Err(error) => {
                        tracing::error!(error = %error, "failed to open main window");
                        cx.quit();
                    }
                }
            })
        })
        .detach();
    });
}
