use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    FaceDetector,
    LandmarkRegressor,
}

impl ModelKind {
    pub fn filename(self) -> &'static str {
        match self {
            ModelKind::FaceDetector => "face_detector_320x240.onnx",
            ModelKind::LandmarkRegressor => "face_landmarks_68.onnx",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelKind::FaceDetector => "face detector",
            ModelKind::LandmarkRegressor => "face landmark",
        }
    }
}

pub fn model_path(model_dir: &Path, kind: ModelKind) -> PathBuf {
    model_dir.join(kind.filename())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelDownloadEvent {
    AlreadyPresent {
        model: ModelKind,
    },
    Started {
        model: ModelKind,
        total: Option<u64>,
    },
    Progress {
        model: ModelKind,
        downloaded: u64,
        total: Option<u64>,
    },
    Finished {
        model: ModelKind,
    },
}

/// Make sure `path` holds the model, fetching it from `url` when missing.
/// Without a URL a missing model is an error.
pub fn ensure_model_ready<F>(
    kind: ModelKind,
    path: &Path,
    url: Option<&str>,
    mut on_event: F,
) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    if path.exists() {
        on_event(ModelDownloadEvent::AlreadyPresent { model: kind });
        on_event(ModelDownloadEvent::Finished { model: kind });
        return Ok(());
    }

    let Some(url) = url else {
        return Err(anyhow!(
            "{} model not found at {} and no download URL configured",
            kind.label(),
            path.display()
        ));
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create model directory {}", parent.display()))?;
    }

    let mut progress: Option<ProgressBar> = None;
    download_to_path(kind, url, path, &mut |event| {
        match &event {
            ModelDownloadEvent::Started { total, .. } => {
                progress = Some(create_progress_bar(*total));
            }
            ModelDownloadEvent::Progress { downloaded, .. } => {
                if let Some(pb) = progress.as_ref() {
                    pb.set_position(*downloaded);
                }
            }
            ModelDownloadEvent::Finished { model } => {
                if let Some(pb) = progress.take() {
                    pb.finish_with_message(format!("{} model ready", model.label()));
                }
            }
            ModelDownloadEvent::AlreadyPresent { .. } => {}
        }
        on_event(event);
    })
    .with_context(|| format!("failed to download {} model to {}", kind.label(), path.display()))
}

fn download_to_path<F>(model: ModelKind, url: &str, dest: &Path, on_event: &mut F) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    log::info!(
        "downloading {} model from {url} to {}",
        model.label(),
        dest.display()
    );

    let mut response = Client::new()
        .get(url)
        .send()
        .context("failed to start model download")?
        .error_for_status()
        .context("model download returned error status")?;

    let total = response.content_length();
    on_event(ModelDownloadEvent::Started { model, total });

    let tmp_path = dest.with_extension("download");
    let mut file =
        fs::File::create(&tmp_path).with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let n = response
            .read(&mut buffer)
            .context("failed while reading model bytes")?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n])
            .context("failed while writing model to disk")?;
        downloaded += n as u64;
        on_event(ModelDownloadEvent::Progress {
            model,
            downloaded,
            total,
        });
    }

    file.sync_all()
        .context("failed to flush downloaded model to disk")?;
    fs::rename(&tmp_path, dest).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            tmp_path.display(),
            dest.display()
        )
    })?;

    on_event(ModelDownloadEvent::Finished { model });
    Ok(())
}

fn create_progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} downloading model") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("makeup-mirror-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn model_paths_use_fixed_filenames() {
        let dir = Path::new("models");
        assert_eq!(
            model_path(dir, ModelKind::FaceDetector),
            PathBuf::from("models/face_detector_320x240.onnx")
        );
        assert_eq!(
            model_path(dir, ModelKind::LandmarkRegressor),
            PathBuf::from("models/face_landmarks_68.onnx")
        );
    }

    #[test]
    fn present_model_is_not_downloaded() {
        let dir = scratch_dir("present");
        let path = model_path(&dir, ModelKind::FaceDetector);
        fs::write(&path, b"onnx").unwrap();

        let mut events = Vec::new();
        ensure_model_ready(ModelKind::FaceDetector, &path, None, |e| events.push(e)).unwrap();
        assert_eq!(
            events,
            vec![
                ModelDownloadEvent::AlreadyPresent {
                    model: ModelKind::FaceDetector
                },
                ModelDownloadEvent::Finished {
                    model: ModelKind::FaceDetector
                },
            ]
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_model_without_url_fails() {
        let dir = scratch_dir("missing");
        let path = model_path(&dir, ModelKind::LandmarkRegressor);
        let err = ensure_model_ready(ModelKind::LandmarkRegressor, &path, None, |_| {}).unwrap_err();
        assert!(err.to_string().contains("no download URL"));
        let _ = fs::remove_dir_all(&dir);
    }
}
