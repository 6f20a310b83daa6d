//! Demo application for the ergonomic-win32 library.
//!
//! Usage: `ergonomic-win32 [config.json]`. Set `RUST_LOG=debug` to see what
//! the library does underneath.

use ergonomic_win32::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings read from the optional JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct DemoConfig {
    title: String,
    width: i32,
    height: i32,
    items: Vec<String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "Ergonomic Win32 Demo".to_owned(),
            width: 520,
            height: 400,
            items: vec!["alpha".to_owned(), "beta".to_owned()],
        }
    }
}

impl DemoConfig {
    fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::custom(format!("Invalid config: {e}")))
    }

    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = match std::env::args_os().nth(1) {
        Some(path) => DemoConfig::load(Path::new(&path))?,
        None => DemoConfig::default(),
    };
    log::info!("starting with {config:?}");

    let code = demo::run(config)?;
    log::info!("exited with code {code}");
    Ok(())
}

#[cfg(windows)]
mod demo {
    use super::DemoConfig;
    use ergonomic_win32::controls::ProgressState;
    use ergonomic_win32::error::Result;
    use ergonomic_win32::prelude::*;
    use ergonomic_win32::shell::FileDialog;

    pub fn run(config: DemoConfig) -> Result<i32> {
        let _com = ComApartment::init(Apartment::SingleThreaded)?;

        let wnd = WindowMain::new(WindowMainOpts {
            title: config.title.clone(),
            class: WindowClassOpts {
                class_name: "ErgonomicWin32.Demo".to_owned(),
                ..Default::default()
            },
            size: (config.width, config.height),
            ..Default::default()
        });

        let input = Edit::new(&wnd, EditOpts {
            position: (10, 10),
            size: (250, 23),
            resize: Anchor::new(Horz::Resize, Vert::None),
            ..Default::default()
        })?;
        let add = Button::new(&wnd, ButtonOpts {
            text: "&Add".to_owned(),
            position: (270, 9),
            resize: Anchor::new(Horz::Repos, Vert::None),
            ..Default::default()
        })?;
        let browse = Button::new(&wnd, ButtonOpts {
            text: "&Browse...".to_owned(),
            position: (366, 9),
            resize: Anchor::new(Horz::Repos, Vert::None),
            ..Default::default()
        })?;
        let list = ListView::new(&wnd, ListViewOpts {
            columns: vec![("Text".to_owned(), 200), ("Length".to_owned(), 80)],
            position: (10, 44),
            size: (480, 240),
            resize: Anchor::new(Horz::Resize, Vert::Resize),
            ..Default::default()
        })?;
        let progress = ProgressBar::new(&wnd, ProgressBarOpts {
            position: (10, 294),
            size: (480, 16),
            range: (0, 10),
            resize: Anchor::new(Horz::Resize, Vert::Repos),
            ..Default::default()
        })?;
        let status = StatusBar::new(&wnd, &[SbPart::Proportional(1), SbPart::Fixed(120)])?;

        let (list2, status2, items) = (list.clone(), status.clone(), config.items);
        wnd.on().wm_create(move || {
            for item in &items {
                add_row(&list2, item)?;
            }
            status2.set_text(0, "Ready")?;
            status2.set_text(1, &format!("{} items", list2.item_count()))?;
            Ok(())
        });

        let (input2, list2, status2, progress2) =
            (input.clone(), list.clone(), status.clone(), progress.clone());
        add.on().bn_clicked(move || {
            let text = input2.hwnd().text()?;
            if text.is_empty() {
                progress2.set_state(ProgressState::Error);
                status2.set_text(0, "Nothing to add")?;
                return Ok(());
            }
            add_row(&list2, &text)?;
            input2.hwnd().set_text("")?;
            progress2.set_state(ProgressState::Normal);
            progress2.step();
            status2.set_text(1, &format!("{} items", list2.item_count()))?;
            Ok(())
        });

        let (wnd2, input2) = (wnd.clone(), input.clone());
        browse.on().bn_clicked(move || {
            let dlg = FileDialog::open()?;
            dlg.set_title("Pick a file")?;
            dlg.set_file_types(&[("All files", "*.*")])?;
            if dlg.show(wnd2.hwnd())? {
                let path = dlg.result()?.file_path()?;
                input2.hwnd().set_text(&path.to_string_lossy())?;
            }
            Ok(())
        });

        let (list2, status2) = (list.clone(), status.clone());
        list.on().lvn_item_changed(move |nm| {
            if nm.became_selected() {
                let text = list2.item_text(nm.item as u32, 0)?;
                status2.set_text(0, &format!("Selected: {text}"))?;
            }
            Ok(())
        });

        wnd.run_main(None)
    }

    fn add_row(list: &ListView, text: &str) -> Result<u32> {
        list.add_item(&[text, &text.chars().count().to_string()])
    }
}

#[cfg(not(windows))]
mod demo {
    use super::DemoConfig;
    use ergonomic_win32::error::{Error, Result};

    pub fn run(config: DemoConfig) -> Result<i32> {
        log::warn!("cannot open \"{}\" on this platform", config.title);
        Err(Error::custom("The demo needs Windows"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let cfg = DemoConfig::from_json(r#"{ "title": "Custom" }"#).unwrap();
        assert_eq!(cfg.title, "Custom");
        assert_eq!(cfg.width, DemoConfig::default().width);
        assert_eq!(cfg.items, DemoConfig::default().items);
    }

    #[test]
    fn test_config_rejects_bad_json() {
        assert!(DemoConfig::from_json("{ not json").is_err());
        assert!(DemoConfig::from_json(r#"{ "width": "wide" }"#).is_err());
    }

    #[test]
    fn test_config_round_trip_through_file() {
        let cfg = DemoConfig {
            items: vec!["one".to_owned()],
            ..Default::default()
        };
        let name = format!("ergonomic_win32_demo_config_{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, serde_json::to_string_pretty(&cfg).unwrap()).unwrap();
        assert_eq!(DemoConfig::load(&path).unwrap(), cfg);
        let _ = std::fs::remove_file(&path);
    }
}
