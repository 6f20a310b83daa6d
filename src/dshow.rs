//! DirectShow playback through the filter graph manager.
//!
//! ```ignore
//! let _com = ComApartment::init(Apartment::SingleThreaded)?;
//! let graph = FilterGraph::new()?;
//! graph.render_file(Path::new(r"C:\media\clip.avi"))?;
//!
//! let video = graph.video_window()?;
//! video.set_owner(wnd.hwnd())?;
//! video.set_position(wnd.hwnd().client_rect()?)?;
//!
//! graph.media_control()?.run()?;
//! ```

use crate::com::{create_instance, ClsCtx};
use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::handle::Hwnd;
use crate::layout::Rect;
use crate::string::{from_wide, WideString};
use crate::window::Style;
use std::mem::ManuallyDrop;
use std::path::Path;
use std::time::Duration;
use windows::core::{Interface, PCWSTR};
use windows::Win32::Media::DirectShow::{
    IBaseFilter, IGraphBuilder, IMediaControl, IMediaSeeking, IVideoWindow, FILTER_INFO,
};

/// Class of the filter graph manager.
pub const CLSID_FILTER_GRAPH: Guid = Guid::from_u128(0xe436ebb3_524f_11ce_9f53_0020af0ba770);

/// Class of the default video renderer.
pub const CLSID_VIDEO_RENDERER_DEFAULT: Guid =
    Guid::from_u128(0x6bc1cffa_8fc1_4261_ac22_cfb4cc38db50);

const AM_SEEKING_NO_POSITIONING: u32 = 0;
const AM_SEEKING_ABSOLUTE_POSITIONING: u32 = 1;

const OA_TRUE: i32 = -1;
const OA_FALSE: i32 = 0;

// Wait no longer than this for a state transition to settle.
const STATE_TIMEOUT_MS: i32 = 100;

/// Converts DirectShow reference time, in 100-ns units.
pub fn from_ref_time(units: i64) -> Duration {
    let units = units.max(0) as u64;
    Duration::new(units / 10_000_000, (units % 10_000_000) as u32 * 100)
}

/// Converts to DirectShow reference time, saturating at `i64::MAX`.
pub fn to_ref_time(d: Duration) -> i64 {
    i64::try_from(d.as_nanos() / 100).unwrap_or(i64::MAX)
}

/// Running state of a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterState {
    /// Stopped.
    Stopped,
    /// Paused, with data cued.
    Paused,
    /// Running.
    Running,
}

impl FilterState {
    fn from_raw(v: i32) -> Result<Self> {
        match v {
            0 => Ok(Self::Stopped),
            1 => Ok(Self::Paused),
            2 => Ok(Self::Running),
            v => Err(Error::custom(format!("Unknown filter state {v}"))),
        }
    }
}

/// A filter graph manager.
#[derive(Clone, Debug)]
pub struct FilterGraph {
    inner: IGraphBuilder,
}

impl FilterGraph {
    /// Creates an empty graph. COM must be initialized on this thread.
    pub fn new() -> Result<Self> {
        Ok(Self {
            inner: create_instance(&CLSID_FILTER_GRAPH, ClsCtx::InprocServer)?,
        })
    }

    /// The underlying interface.
    pub fn as_inner(&self) -> &IGraphBuilder {
        &self.inner
    }

    /// Builds a playback graph for a media file.
    pub fn render_file(&self, path: &Path) -> Result<()> {
        let wide = WideString::from_path(path);
        // SAFETY: the path lives during the call; no playlist.
        unsafe { self.inner.RenderFile(wide.as_pcwstr(), PCWSTR::null())? };
        log::debug!("rendered {}", path.display());
        Ok(())
    }

    /// Adds a filter under a display name, which must be unique in the graph.
    pub fn add_filter(&self, filter: &BaseFilter, name: &str) -> Result<()> {
        let wide = WideString::new(name);
        // SAFETY: the name lives during the call; the graph keeps its own
        // reference to the filter.
        unsafe { self.inner.AddFilter(&filter.inner, wide.as_pcwstr())? };
        Ok(())
    }

    /// Removes a filter.
    pub fn remove_filter(&self, filter: &BaseFilter) -> Result<()> {
        // SAFETY: plain call with a live interface.
        unsafe { self.inner.RemoveFilter(&filter.inner)? };
        Ok(())
    }

    /// Returns the filters currently in the graph.
    pub fn filters(&self) -> Result<Vec<BaseFilter>> {
        // SAFETY: plain call on a live interface.
        let e = unsafe { self.inner.EnumFilters()? };
        let mut out = Vec::new();
        loop {
            let mut slot = [None];
            let mut fetched = 0u32;
            // SAFETY: `slot` holds one element and `fetched` outlives the call.
            let hr = unsafe { e.Next(&mut slot, Some(&mut fetched as *mut u32)) };
            hr.ok()?;
            match slot[0].take() {
                Some(f) if fetched == 1 => out.push(BaseFilter { inner: f }),
                _ => break,
            }
        }
        Ok(out)
    }

    /// Playback control.
    pub fn media_control(&self) -> Result<MediaControl> {
        Ok(MediaControl {
            inner: self.inner.cast()?,
        })
    }

    /// Seeking.
    pub fn media_seeking(&self) -> Result<MediaSeeking> {
        Ok(MediaSeeking {
            inner: self.inner.cast()?,
        })
    }

    /// The video renderer's window. Fails if the graph has no video.
    pub fn video_window(&self) -> Result<VideoWindow> {
        Ok(VideoWindow {
            inner: self.inner.cast()?,
        })
    }
}

/// A filter, either created directly or found in a graph.
#[derive(Clone, Debug)]
pub struct BaseFilter {
    inner: IBaseFilter,
}

impl BaseFilter {
    /// Wraps an `IBaseFilter` pointer.
    pub fn new(inner: IBaseFilter) -> Self {
        Self { inner }
    }

    /// Creates a filter from its class ID.
    pub fn from_clsid(clsid: &Guid) -> Result<Self> {
        Ok(Self::new(create_instance(clsid, ClsCtx::InprocServer)?))
    }

    /// The underlying interface.
    pub fn as_inner(&self) -> &IBaseFilter {
        &self.inner
    }

    /// Display name given when the filter joined its graph; empty otherwise.
    pub fn name(&self) -> Result<String> {
        let mut info = FILTER_INFO::default();
        // SAFETY: `info` is a valid out parameter.
        unsafe { self.inner.QueryFilterInfo(&mut info)? };
        // The graph pointer comes back with a reference taken.
        // SAFETY: dropped exactly once, and `info` is not used for it again.
        unsafe { ManuallyDrop::drop(&mut info.pGraph) };
        let len = info
            .achName
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(info.achName.len());
        from_wide(&info.achName[..len])
    }
}

/// Runs, pauses and stops a graph.
#[derive(Clone, Debug)]
pub struct MediaControl {
    inner: IMediaControl,
}

impl MediaControl {
    /// Starts playback. The transition may complete asynchronously.
    pub fn run(&self) -> Result<()> {
        // SAFETY: plain call on a live interface.
        unsafe { self.inner.Run()? };
        Ok(())
    }

    /// Pauses playback.
    pub fn pause(&self) -> Result<()> {
        // SAFETY: as above.
        unsafe { self.inner.Pause()? };
        Ok(())
    }

    /// Stops playback.
    pub fn stop(&self) -> Result<()> {
        // SAFETY: as above.
        unsafe { self.inner.Stop()? };
        Ok(())
    }

    /// Current state, waiting briefly for a pending transition.
    pub fn state(&self) -> Result<FilterState> {
        // SAFETY: as above.
        let raw = unsafe { self.inner.GetState(STATE_TIMEOUT_MS)? };
        FilterState::from_raw(raw)
    }
}

/// Position and duration of the stream.
#[derive(Clone, Debug)]
pub struct MediaSeeking {
    inner: IMediaSeeking,
}

impl MediaSeeking {
    /// Length of the stream.
    pub fn duration(&self) -> Result<Duration> {
        // SAFETY: plain call on a live interface.
        Ok(from_ref_time(unsafe { self.inner.GetDuration()? }))
    }

    /// Current position.
    pub fn position(&self) -> Result<Duration> {
        // SAFETY: as above.
        Ok(from_ref_time(unsafe { self.inner.GetCurrentPosition()? }))
    }

    /// Moves to an absolute position; the stop position is left unchanged.
    pub fn set_position(&self, pos: Duration) -> Result<()> {
        let mut current = to_ref_time(pos);
        let mut stop = 0i64;
        // SAFETY: both positions outlive the call.
        unsafe {
            self.inner.SetPositions(
                &mut current,
                AM_SEEKING_ABSOLUTE_POSITIONING,
                &mut stop,
                AM_SEEKING_NO_POSITIONING,
            )?
        };
        Ok(())
    }
}

/// Window of a video renderer, which can be embedded in our own.
#[derive(Clone, Debug)]
pub struct VideoWindow {
    inner: IVideoWindow,
}

impl VideoWindow {
    /// Embeds the video into `owner` as a child window.
    pub fn set_owner(&self, owner: Hwnd) -> Result<()> {
        let style = Style::CHILD.with(Style::CLIPSIBLINGS).with(Style::CLIPCHILDREN);
        // SAFETY: plain calls on a live interface.
        unsafe {
            self.inner.SetOwner(owner.as_isize())?;
            self.inner.SetWindowStyle(style.0 as i32)?;
        }
        Ok(())
    }

    /// Moves the video inside the owner's client area.
    pub fn set_position(&self, rc: Rect) -> Result<()> {
        // SAFETY: plain call on a live interface.
        unsafe { self.inner.SetWindowPosition(rc.x, rc.y, rc.width, rc.height)? };
        Ok(())
    }

    /// Shows or hides the video.
    pub fn set_visible(&self, visible: bool) -> Result<()> {
        let v = if visible { OA_TRUE } else { OA_FALSE };
        // SAFETY: as above.
        unsafe { self.inner.SetVisible(v)? };
        Ok(())
    }

    /// Whether the video is visible.
    pub fn is_visible(&self) -> Result<bool> {
        // SAFETY: as above.
        Ok(unsafe { self.inner.Visible()? } != OA_FALSE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::com::{Apartment, ComApartment};

    #[test]
    fn test_ref_time() {
        assert_eq!(from_ref_time(10_000_000), Duration::from_secs(1));
        assert_eq!(from_ref_time(15), Duration::from_nanos(1_500));
        assert_eq!(from_ref_time(-5), Duration::ZERO);
        assert_eq!(to_ref_time(Duration::from_millis(250)), 2_500_000);
        assert_eq!(to_ref_time(Duration::MAX), i64::MAX);
    }

    #[test]
    fn test_filter_state() {
        assert_eq!(FilterState::from_raw(2).unwrap(), FilterState::Running);
        assert!(FilterState::from_raw(7).is_err());
    }

    #[test]
    fn test_empty_graph() {
        let _com = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let graph = FilterGraph::new().unwrap();
        assert!(graph.filters().unwrap().is_empty());
        assert_eq!(graph.media_control().unwrap().state().unwrap(), FilterState::Stopped);
        assert!(graph.media_seeking().is_ok());
    }

    #[test]
    fn test_add_and_remove_filter() {
        let _com = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let graph = FilterGraph::new().unwrap();
        let renderer = BaseFilter::from_clsid(&CLSID_VIDEO_RENDERER_DEFAULT).unwrap();
        assert_eq!(renderer.name().unwrap(), "");

        graph.add_filter(&renderer, "Renderer").unwrap();
        let filters = graph.filters().unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].name().unwrap(), "Renderer");

        graph.remove_filter(&renderer).unwrap();
        assert!(graph.filters().unwrap().is_empty());
    }

    #[test]
    fn test_render_missing_file() {
        let _com = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let graph = FilterGraph::new().unwrap();
        let missing = std::env::temp_dir().join("ergonomic_win32_no_such_clip.avi");
        assert!(graph.render_file(&missing).is_err());
    }
}
