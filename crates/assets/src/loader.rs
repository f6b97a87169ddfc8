use crate::{AssetError, Font, MatcapTexture};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::Instant;

struct Slot<T> {
    result: Option<Result<T, AssetError>>,
    finished: bool,
    taken: bool,
    waker: Option<Waker>,
}

/// Handle to an asset being loaded on a background thread.
///
/// Await it during setup, or call [`LoadHandle::try_take`] once per frame
/// to pick the result up without blocking. The result is yielded once.
pub struct LoadHandle<T> {
    path: PathBuf,
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T: Send + 'static> LoadHandle<T> {
    /// Run `load` on a background thread against `path`.
    pub fn spawn<F>(path: impl Into<PathBuf>, load: F) -> Self
    where
        F: FnOnce(&Path) -> Result<T, AssetError> + Send + 'static,
    {
        let path = path.into();
        let slot = Arc::new(Mutex::new(Slot {
            result: None,
            finished: false,
            taken: false,
            waker: None,
        }));

        let completer = Completer {
            slot: Arc::clone(&slot),
        };
        let worker_path = path.clone();
        let spawned = std::thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || {
                let started = Instant::now();
                let result = load(&worker_path);
                match &result {
                    Ok(_) => tracing::debug!(
                        path = %worker_path.display(),
                        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                        "asset loaded"
                    ),
                    Err(e) => {
                        tracing::debug!(path = %worker_path.display(), "asset load failed: {e}")
                    }
                }
                completer.complete(result);
            });

        if let Err(e) = spawned {
            // The closure, and with it the completer, is already dropped.
            lock(&slot).result = Some(Err(AssetError::Io(e)));
        }

        Self { path, slot }
    }

    /// A handle that is already resolved.
    pub fn ready(path: impl Into<PathBuf>, result: Result<T, AssetError>) -> Self {
        Self {
            path: path.into(),
            slot: Arc::new(Mutex::new(Slot {
                result: Some(result),
                finished: true,
                taken: false,
                waker: None,
            })),
        }
    }
}

impl<T> LoadHandle<T> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the background load has produced a result (taken or not).
    pub fn is_finished(&self) -> bool {
        lock(&self.slot).finished
    }

    /// Take the result if the load has finished. Returns `None` while the
    /// load is still running and after the result has been taken.
    pub fn try_take(&mut self) -> Option<Result<T, AssetError>> {
        let mut slot = lock(&self.slot);
        if slot.taken {
            return None;
        }
        let result = match slot.result.take() {
            Some(result) => result,
            None if slot.finished => Err(AssetError::LoaderGone(self.path.clone())),
            None => return None,
        };
        slot.taken = true;
        Some(result)
    }
}

impl<T> Future for LoadHandle<T> {
    type Output = Result<T, AssetError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = lock(&self.slot);
        if let Some(result) = slot.result.take() {
            slot.taken = true;
            return Poll::Ready(result);
        }
        if slot.taken {
            return Poll::Ready(Err(AssetError::Consumed(self.path.clone())));
        }
        if slot.finished {
            return Poll::Ready(Err(AssetError::LoaderGone(self.path.clone())));
        }
        slot.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

/// Marks the slot finished when dropped, including when the loader panics.
struct Completer<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Completer<T> {
    fn complete(self, result: Result<T, AssetError>) {
        let mut slot = lock(&self.slot);
        slot.result = Some(result);
        slot.finished = true;
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        let waker = {
            let mut slot = lock(&self.slot);
            slot.finished = true;
            slot.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

fn lock<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Start loading a typeface JSON font.
pub fn load_font(path: impl Into<PathBuf>) -> LoadHandle<Font> {
    let path = path.into();
    tracing::debug!(path = %path.display(), "requesting font");
    LoadHandle::spawn(path, |path| {
        let font = Font::from_path(path)?;
        tracing::info!(family = %font.family_name, "font loaded");
        Ok(font)
    })
}

/// Start loading a matcap texture.
pub fn load_texture(path: impl Into<PathBuf>) -> LoadHandle<MatcapTexture> {
    let path = path.into();
    tracing::debug!(path = %path.display(), "requesting texture");
    LoadHandle::spawn(path, |path| MatcapTexture::from_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::tests::TEST_FONT;
    use std::io::Write;
    use std::time::Duration;

    fn font_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEST_FONT.as_bytes()).unwrap();
        file
    }

    #[test]
    fn await_font() {
        let file = font_file();
        let font = pollster::block_on(load_font(file.path())).unwrap();
        assert_eq!(font.family_name, "Test Block");
    }

    #[test]
    fn missing_font_reports_error() {
        let result = pollster::block_on(load_font("/nonexistent/font.json"));
        assert!(matches!(result, Err(AssetError::Io(_))));
    }

    #[test]
    fn try_take_yields_once() {
        let file = font_file();
        let mut handle = load_font(file.path());
        let mut result = None;
        for _ in 0..500 {
            if let Some(r) = handle.try_take() {
                result = Some(r);
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(result.expect("load finished").is_ok());
        assert!(handle.is_finished());
        assert!(handle.try_take().is_none());
    }

    #[test]
    fn polling_after_take_is_an_error() {
        let mut handle = LoadHandle::ready("x", Ok(1u32));
        assert_eq!(handle.try_take().unwrap().unwrap(), 1);
        let again = pollster::block_on(handle);
        assert!(matches!(again, Err(AssetError::Consumed(_))));
    }

    #[test]
    fn panicking_loader_is_reported() {
        let handle: LoadHandle<u32> = LoadHandle::spawn("boom", |_| panic!("loader panicked"));
        let result = pollster::block_on(handle);
        assert!(matches!(result, Err(AssetError::LoaderGone(_))));
    }

    #[test]
    fn panicking_loader_is_reported_once_by_try_take() {
        let mut handle: LoadHandle<u32> = LoadHandle::spawn("boom", |_| panic!("loader panicked"));
        let mut result = None;
        for _ in 0..500 {
            if let Some(r) = handle.try_take() {
                result = Some(r);
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(matches!(result, Some(Err(AssetError::LoaderGone(_)))));
        assert!(handle.try_take().is_none());
    }

    #[test]
    fn texture_load_failure_is_reported() {
        let file = font_file();
        let result = pollster::block_on(load_texture(file.path()));
        assert!(matches!(result, Err(AssetError::Image(_))));
    }
}
