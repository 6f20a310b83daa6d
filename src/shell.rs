//! Shell objects: items, file dialogs and the taskbar button.
//!
//! All of these are COM objects, so the calling thread needs a
//! single-threaded [`ComApartment`](crate::com::ComApartment).

use crate::com::{co_task_string, create_instance, ClsCtx};
use crate::error::{Error, ErrorCode, Result};
use crate::handle::Hwnd;
use crate::string::WideString;
use std::path::{Path, PathBuf};
use windows::core::Interface;
use windows::Win32::System::SystemServices::SFGAO_FOLDER;
use windows::Win32::UI::Shell::Common::COMDLG_FILTERSPEC;
use windows::Win32::UI::Shell::{
    FileOpenDialog, FileSaveDialog, IFileDialog, IFileOpenDialog, IShellItem, ITaskbarList3,
    SHCreateItemFromParsingName, TaskbarList, FILEOPENDIALOGOPTIONS, SIGDN, SIGDN_DESKTOPABSOLUTEPARSING,
    SIGDN_FILESYSPATH, SIGDN_NORMALDISPLAY, SIGDN_PARENTRELATIVEEDITING,
    SIGDN_PARENTRELATIVEPARSING, SIGDN_URL, TBPFLAG, TBPF_ERROR, TBPF_INDETERMINATE,
    TBPF_NOPROGRESS, TBPF_NORMAL, TBPF_PAUSED,
};

/// Which form of an item's name to retrieve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayNameKind {
    /// Friendly name, as shown in Explorer.
    Normal,
    /// File system path; fails for virtual items.
    FileSysPath,
    /// Name relative to the parent folder, for parsing.
    ParentRelativeParsing,
    /// Name relative to the parent folder, for editing.
    ParentRelativeEditing,
    /// Full parsing name relative to the desktop.
    DesktopAbsoluteParsing,
    /// URL form.
    Url,
}

impl DisplayNameKind {
    fn raw(self) -> SIGDN {
        match self {
            Self::Normal => SIGDN_NORMALDISPLAY,
            Self::FileSysPath => SIGDN_FILESYSPATH,
            Self::ParentRelativeParsing => SIGDN_PARENTRELATIVEPARSING,
            Self::ParentRelativeEditing => SIGDN_PARENTRELATIVEEDITING,
            Self::DesktopAbsoluteParsing => SIGDN_DESKTOPABSOLUTEPARSING,
            Self::Url => SIGDN_URL,
        }
    }
}

/// An item of the shell namespace (`IShellItem`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShellItem {
    inner: IShellItem,
}

impl ShellItem {
    /// Wraps an `IShellItem`.
    pub fn new(inner: IShellItem) -> Self {
        Self { inner }
    }

    /// Parses a file system path. The item must exist.
    pub fn from_path(path: &Path) -> Result<Self> {
        let wide = WideString::from_path(path);
        // SAFETY: the path lives during the call.
        let inner = unsafe { SHCreateItemFromParsingName(wide.as_pcwstr(), None)? };
        Ok(Self { inner })
    }

    /// The underlying interface.
    pub fn as_inner(&self) -> &IShellItem {
        &self.inner
    }

    /// Returns one of the item's names.
    pub fn display_name(&self, kind: DisplayNameKind) -> Result<String> {
        // SAFETY: the returned string is ours to free.
        unsafe {
            let name = self.inner.GetDisplayName(kind.raw())?;
            co_task_string(name)
        }
    }

    /// Returns the file system path.
    pub fn file_path(&self) -> Result<PathBuf> {
        self.display_name(DisplayNameKind::FileSysPath).map(PathBuf::from)
    }

    /// Returns the parent folder.
    pub fn parent(&self) -> Result<Self> {
        // SAFETY: plain call on a live interface.
        let inner = unsafe { self.inner.GetParent()? };
        Ok(Self { inner })
    }

    /// Whether the item is a folder.
    pub fn is_folder(&self) -> Result<bool> {
        // SAFETY: plain call on a live interface.
        let attrs = unsafe { self.inner.GetAttributes(SFGAO_FOLDER)? };
        Ok(attrs.0 & SFGAO_FOLDER.0 != 0)
    }
}

/// Behavior flags of a [`FileDialog`] (`FOS_*`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileDialogOptions(pub u32);

impl FileDialogOptions {
    /// Ask before overwriting an existing file (save dialogs).
    pub const OVERWRITE_PROMPT: Self = Self(0x0000_0002);
    /// Only file system items can be picked.
    pub const FORCE_FILESYSTEM: Self = Self(0x0000_0040);
    /// Pick folders instead of files.
    pub const PICK_FOLDERS: Self = Self(0x0000_0020);
    /// Several items can be picked (open dialogs).
    pub const ALLOW_MULTI_SELECT: Self = Self(0x0000_0200);
    /// The folder of the picked item must exist.
    pub const PATH_MUST_EXIST: Self = Self(0x0000_0800);
    /// The picked item must exist.
    pub const FILE_MUST_EXIST: Self = Self(0x0000_1000);

    /// Combines flags.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether every flag of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A common item dialog, for opening or saving.
///
/// ```ignore
/// let dlg = FileDialog::open()?;
/// dlg.set_file_types(&[("Text files", "*.txt"), ("All files", "*.*")])?;
/// if dlg.show(wnd.hwnd())? {
///     println!("{}", dlg.result()?.file_path()?.display());
/// }
/// ```
#[derive(Clone, Debug)]
pub struct FileDialog {
    inner: IFileDialog,
}

impl FileDialog {
    /// Creates an open dialog.
    pub fn open() -> Result<Self> {
        Ok(Self {
            inner: create_instance(&FileOpenDialog.into(), ClsCtx::InprocServer)?,
        })
    }

    /// Creates a save dialog.
    pub fn save() -> Result<Self> {
        Ok(Self {
            inner: create_instance(&FileSaveDialog.into(), ClsCtx::InprocServer)?,
        })
    }

    /// The underlying interface.
    pub fn as_inner(&self) -> &IFileDialog {
        &self.inner
    }

    /// Sets the caption.
    pub fn set_title(&self, title: &str) -> Result<()> {
        let wide = WideString::new(title);
        // SAFETY: the string lives during the call.
        unsafe { self.inner.SetTitle(wide.as_pcwstr())? };
        Ok(())
    }

    /// Sets the type filters, as display name and pattern pairs such as
    /// `("Images", "*.png;*.jpg")`.
    pub fn set_file_types(&self, types: &[(&str, &str)]) -> Result<()> {
        let names: Vec<(WideString, WideString)> = types
            .iter()
            .map(|(name, spec)| (WideString::new(name), WideString::new(spec)))
            .collect();
        let specs: Vec<COMDLG_FILTERSPEC> = names
            .iter()
            .map(|(name, spec)| COMDLG_FILTERSPEC {
                pszName: name.as_pcwstr(),
                pszSpec: spec.as_pcwstr(),
            })
            .collect();
        // SAFETY: the dialog copies the strings, which live during the call.
        unsafe { self.inner.SetFileTypes(&specs)? };
        Ok(())
    }

    /// Selects a filter, counting from 1.
    pub fn set_file_type_index(&self, index: u32) -> Result<()> {
        // SAFETY: plain call on a live interface.
        unsafe { self.inner.SetFileTypeIndex(index)? };
        Ok(())
    }

    /// The selected filter, counting from 1.
    pub fn file_type_index(&self) -> Result<u32> {
        // SAFETY: plain call on a live interface.
        Ok(unsafe { self.inner.GetFileTypeIndex()? })
    }

    /// Sets the text of the file name box.
    pub fn set_file_name(&self, name: &str) -> Result<()> {
        let wide = WideString::new(name);
        // SAFETY: the string lives during the call.
        unsafe { self.inner.SetFileName(wide.as_pcwstr())? };
        Ok(())
    }

    /// Returns the text of the file name box.
    pub fn file_name(&self) -> Result<String> {
        // SAFETY: the returned string is ours to free.
        unsafe {
            let name = self.inner.GetFileName()?;
            co_task_string(name)
        }
    }

    /// Sets the extension appended to names typed without one, without the dot.
    pub fn set_default_extension(&self, ext: &str) -> Result<()> {
        let wide = WideString::new(ext);
        // SAFETY: the string lives during the call.
        unsafe { self.inner.SetDefaultExtension(wide.as_pcwstr())? };
        Ok(())
    }

    /// Sets the folder the dialog opens in.
    pub fn set_folder(&self, folder: &ShellItem) -> Result<()> {
        // SAFETY: plain call on live interfaces.
        unsafe { self.inner.SetFolder(&folder.inner)? };
        Ok(())
    }

    /// Returns the current flags.
    pub fn options(&self) -> Result<FileDialogOptions> {
        // SAFETY: plain call on a live interface.
        let fos = unsafe { self.inner.GetOptions()? };
        Ok(FileDialogOptions(fos.0 as u32))
    }

    /// Adds flags to the current ones.
    pub fn add_options(&self, opts: FileDialogOptions) -> Result<()> {
        let merged = self.options()?.with(opts);
        // SAFETY: plain call on a live interface.
        unsafe { self.inner.SetOptions(FILEOPENDIALOGOPTIONS(merged.0 as _))? };
        Ok(())
    }

    /// Shows the dialog modally. Returns `false` if the user cancelled.
    pub fn show(&self, owner: Hwnd) -> Result<bool> {
        // SAFETY: a null owner gives an ownerless dialog.
        match unsafe { self.inner.Show(owner.raw()) } {
            Ok(()) => Ok(true),
            Err(e) => {
                let e = Error::from(e);
                if e.win32_error_code() == Some(ErrorCode::CANCELLED) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// The picked item, after `show` returned `true`.
    pub fn result(&self) -> Result<ShellItem> {
        // SAFETY: plain call on a live interface.
        let item = unsafe { self.inner.GetResult()? };
        Ok(ShellItem::new(item))
    }

    /// Every picked item, for multi-select open dialogs.
    ///
    /// Save dialogs return their single result.
    pub fn results(&self) -> Result<Vec<ShellItem>> {
        let Ok(open) = self.inner.cast::<IFileOpenDialog>() else {
            return Ok(vec![self.result()?]);
        };
        // SAFETY: plain calls on live interfaces.
        unsafe {
            let arr = open.GetResults()?;
            let count = arr.GetCount()?;
            (0..count)
                .map(|i| Ok(ShellItem::new(arr.GetItemAt(i)?)))
                .collect()
        }
    }
}

/// Progress display of a taskbar button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskbarProgress {
    /// No progress shown.
    None,
    /// Pulsing, for unknown totals.
    Indeterminate,
    /// Green.
    Normal,
    /// Red.
    Error,
    /// Yellow.
    Paused,
}

/// The taskbar button of a window (`ITaskbarList3`).
#[derive(Clone, Debug)]
pub struct Taskbar {
    inner: ITaskbarList3,
}

impl Taskbar {
    /// Connects to the taskbar.
    pub fn new() -> Result<Self> {
        let inner: ITaskbarList3 = create_instance(&TaskbarList.into(), ClsCtx::InprocServer)?;
        // SAFETY: must be called once before any other method.
        unsafe { inner.HrInit()? };
        Ok(Self { inner })
    }

    /// Shows `completed` out of `total` on the button of `hwnd`.
    pub fn set_progress_value(&self, hwnd: Hwnd, completed: u64, total: u64) -> Result<()> {
        // SAFETY: plain call on a live interface.
        unsafe { self.inner.SetProgressValue(hwnd.raw(), completed, total)? };
        Ok(())
    }

    /// Sets how progress is shown on the button of `hwnd`.
    pub fn set_progress_state(&self, hwnd: Hwnd, state: TaskbarProgress) -> Result<()> {
        let flag: TBPFLAG = match state {
            TaskbarProgress::None => TBPF_NOPROGRESS,
            TaskbarProgress::Indeterminate => TBPF_INDETERMINATE,
            TaskbarProgress::Normal => TBPF_NORMAL,
            TaskbarProgress::Error => TBPF_ERROR,
            TaskbarProgress::Paused => TBPF_PAUSED,
        };
        // SAFETY: plain call on a live interface.
        unsafe { self.inner.SetProgressState(hwnd.raw(), flag)? };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::com::{Apartment, ComApartment};

    fn windows_dir() -> PathBuf {
        PathBuf::from(std::env::var("SystemRoot").unwrap_or_else(|_| r"C:\Windows".to_owned()))
    }

    #[test]
    fn test_folder_item() {
        let _com = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let dir = windows_dir();
        let item = ShellItem::from_path(&dir).unwrap();
        assert!(item.is_folder().unwrap());
        let path = item.file_path().unwrap();
        assert!(path.to_string_lossy().eq_ignore_ascii_case(&dir.to_string_lossy()));

        let parent = item.parent().unwrap();
        let root = parent.file_path().unwrap();
        assert_eq!(root.parent(), None);
        assert!(!item.display_name(DisplayNameKind::Normal).unwrap().is_empty());
    }

    #[test]
    fn test_file_item() {
        let _com = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let path = std::env::temp_dir().join("ergonomic_win32_shell_item.txt");
        std::fs::write(&path, b"x").unwrap();

        let item = ShellItem::from_path(&path).unwrap();
        assert!(!item.is_folder().unwrap());
        assert_eq!(
            item.display_name(DisplayNameKind::ParentRelativeParsing).unwrap(),
            "ergonomic_win32_shell_item.txt"
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_item() {
        let _com = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let err = ShellItem::from_path(Path::new(r"C:\no\such\ergonomic_win32\path")).unwrap_err();
        assert!(err.win32_error_code().is_some());
    }

    #[test]
    fn test_dialog_settings() {
        let _com = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let dlg = FileDialog::open().unwrap();
        dlg.set_title("Pick").unwrap();
        dlg.set_file_types(&[("Text", "*.txt"), ("All", "*.*")]).unwrap();
        dlg.set_file_type_index(2).unwrap();
        assert_eq!(dlg.file_type_index().unwrap(), 2);
        dlg.set_file_name("notes.txt").unwrap();
        assert_eq!(dlg.file_name().unwrap(), "notes.txt");
        dlg.set_default_extension("txt").unwrap();
        dlg.set_folder(&ShellItem::from_path(&windows_dir()).unwrap()).unwrap();

        dlg.add_options(FileDialogOptions::ALLOW_MULTI_SELECT).unwrap();
        let opts = dlg.options().unwrap();
        assert!(opts.contains(FileDialogOptions::ALLOW_MULTI_SELECT));
        // Open dialogs require existing files by default.
        assert!(opts.contains(FileDialogOptions::FILE_MUST_EXIST));

        // Nothing picked before the dialog is shown.
        assert!(dlg.result().is_err());
    }

    #[test]
    fn test_save_dialog_options() {
        let _com = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let dlg = FileDialog::save().unwrap();
        assert!(dlg.options().unwrap().contains(FileDialogOptions::OVERWRITE_PROMPT));
        assert!(dlg.results().is_err());
    }

    #[test]
    fn test_taskbar_connects() {
        let _com = ComApartment::init(Apartment::SingleThreaded).unwrap();
        assert!(Taskbar::new().is_ok());
    }
}
