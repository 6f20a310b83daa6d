use super::{nm, opt_index, set_theme, BaseControl, GuiControl, NativeCreate};
use crate::error::{Error, Result};
use crate::events::WindowEvents;
use crate::handle::Hwnd;
use crate::layout::Anchor;
use crate::msg::{NmHdr, WndMsg};
use crate::string::{WideBuf, WideString};
use crate::window::{ExStyle, GuiParent, Style};
use std::rc::Rc;
use windows::Win32::Foundation::POINT;

const LVS_REPORT: u32 = 0x0001;
const LVS_SHOWSELALWAYS: u32 = 0x0008;

const LVM_GETITEMCOUNT: u32 = 0x1004;
const LVM_DELETEITEM: u32 = 0x1008;
const LVM_DELETEALLITEMS: u32 = 0x1009;
const LVM_GETNEXTITEM: u32 = 0x100C;
const LVM_GETHEADER: u32 = 0x101F;
const LVM_SETITEMSTATE: u32 = 0x102B;
const LVM_SETEXTENDEDLISTVIEWSTYLE: u32 = 0x1036;
const LVM_GETEXTENDEDLISTVIEWSTYLE: u32 = 0x1037;
const LVM_INSERTITEMW: u32 = 0x104D;
const LVM_INSERTCOLUMNW: u32 = 0x1061;
const LVM_GETITEMTEXTW: u32 = 0x1073;
const LVM_SETITEMTEXTW: u32 = 0x1074;
const HDM_GETITEMCOUNT: u32 = 0x1200;

const LVIF_TEXT: u32 = 0x0001;
const LVIS_SELECTED: u32 = 0x0002;
const LVNI_SELECTED: usize = 0x0002;
const LVCF_WIDTH: u32 = 0x0002;
const LVCF_TEXT: u32 = 0x0004;

const LVN_ITEMCHANGED: i32 = -101;
const LVN_COLUMNCLICK: i32 = -108;
const LVN_KEYDOWN: i32 = -155;

#[repr(C)]
struct LvItem {
    mask: u32,
    item: i32,
    sub_item: i32,
    state: u32,
    state_mask: u32,
    text: *mut u16,
    text_max: i32,
    image: i32,
    lparam: isize,
    indent: i32,
    group_id: i32,
    columns: u32,
    pu_columns: *mut u32,
    col_fmt: *mut i32,
    group: i32,
}

impl Default for LvItem {
    fn default() -> Self {
        Self {
            mask: 0,
            item: 0,
            sub_item: 0,
            state: 0,
            state_mask: 0,
            text: std::ptr::null_mut(),
            text_max: 0,
            image: 0,
            lparam: 0,
            indent: 0,
            group_id: 0,
            columns: 0,
            pu_columns: std::ptr::null_mut(),
            col_fmt: std::ptr::null_mut(),
            group: 0,
        }
    }
}

#[repr(C)]
struct LvColumn {
    mask: u32,
    fmt: i32,
    cx: i32,
    text: *const u16,
    text_max: i32,
    sub_item: i32,
    image: i32,
    order: i32,
    cx_min: i32,
    cx_default: i32,
    cx_ideal: i32,
}

#[repr(C, packed(1))]
struct NmLvKeyDown {
    hdr: NmHdr,
    vkey: u16,
    flags: u32,
}

/// `NMLISTVIEW`, sent with item and column notifications.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct NmListView {
    /// Common header.
    pub hdr: NmHdr,
    /// Item index, or -1.
    pub item: i32,
    /// Subitem index, or the clicked column.
    pub sub_item: i32,
    /// New item state.
    pub new_state: u32,
    /// Old item state.
    pub old_state: u32,
    /// Changed attributes (`LVIF_*`).
    pub changed: u32,
    /// Where the event happened, in client coordinates.
    pub pt_action: POINT,
    /// Item data.
    pub lparam: isize,
}

impl NmListView {
    /// The item became selected with this change.
    pub fn became_selected(&self) -> bool {
        self.new_state & LVIS_SELECTED != 0 && self.old_state & LVIS_SELECTED == 0
    }
}

/// `NMITEMACTIVATE`, sent with clicks on a list view.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct NmItemActivate {
    /// Common header.
    pub hdr: NmHdr,
    /// Clicked item, or -1 for empty space.
    pub item: i32,
    /// Clicked subitem.
    pub sub_item: i32,
    /// New item state.
    pub new_state: u32,
    /// Old item state.
    pub old_state: u32,
    /// Changed attributes.
    pub changed: u32,
    /// Click point, in client coordinates.
    pub pt_action: POINT,
    /// Item data.
    pub lparam: isize,
    /// Modifier keys (`LVKF_*`).
    pub key_flags: u32,
}

impl NmItemActivate {
    /// The clicked item, if any.
    pub fn item_index(&self) -> Option<u32> {
        u32::try_from(self.item).ok()
    }
}

/// Options of [`ListView`].
#[derive(Debug, Clone)]
pub struct ListViewOpts {
    /// Columns, as title and width.
    pub columns: Vec<(String, i32)>,
    /// Position in the parent's client area.
    pub position: (i32, i32),
    /// Size.
    pub size: (i32, i32),
    /// Control ID; `None` allocates one.
    pub ctrl_id: Option<u16>,
    /// Extended list view style bits, see [`ListView::EX_FULL_ROW_SELECT`].
    pub list_ex_style: u32,
    /// Extra window style bits.
    pub style: Style,
    /// Behavior when the parent is resized.
    pub resize: Anchor,
}

impl Default for ListViewOpts {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            position: (0, 0),
            size: (240, 160),
            ctrl_id: None,
            list_ex_style: ListView::EX_FULL_ROW_SELECT | ListView::EX_DOUBLE_BUFFER,
            style: Style::CHILD.with(Style::VISIBLE).with(Style::TABSTOP).with(Style::GROUP),
            resize: Anchor::default(),
        }
    }
}

/// A list view in report mode: rows of text under column headers.
#[derive(Clone, Debug)]
pub struct ListView {
    base: Rc<BaseControl>,
}

impl GuiControl for ListView {
    fn base(&self) -> &Rc<BaseControl> {
        &self.base
    }
}

impl ListView {
    /// Grid lines around items and subitems.
    pub const EX_GRID_LINES: u32 = 0x0000_0001;
    /// Clicking selects the whole row.
    pub const EX_FULL_ROW_SELECT: u32 = 0x0000_0020;
    /// Double-buffered painting, to reduce flicker.
    pub const EX_DOUBLE_BUFFER: u32 = 0x0001_0000;

    /// Declares a list view, created with its parent.
    pub fn new(parent: &impl GuiParent, opts: ListViewOpts) -> Result<Self> {
        let base = BaseControl::new(parent, opts.ctrl_id);
        let columns = opts.columns;
        let ex = opts.list_ex_style;
        base.create(
            NativeCreate {
                class: "SysListView32",
                text: String::new(),
                position: opts.position,
                size: opts.size,
                style: opts.style.with(Style(LVS_REPORT | LVS_SHOWSELALWAYS)),
                ex_style: ExStyle::CLIENTEDGE,
                resize: opts.resize,
            },
            move |hwnd| {
                if let Err(e) = set_theme(hwnd, "Explorer") {
                    log::debug!("list view theme not applied: {e}");
                }
                hwnd.send_message(WndMsg::new(LVM_SETEXTENDEDLISTVIEWSTYLE, ex as usize, ex as isize));
                for (title, width) in &columns {
                    insert_column(hwnd, title, *width)?;
                }
                Ok(())
            },
        )?;
        Ok(Self { base })
    }

    /// Notifications sent by this list view.
    pub fn on(&self) -> ListViewEvents<'_> {
        ListViewEvents {
            parent: self.base.parent_events(),
            ctrl_id: self.base.ctrl_id(),
        }
    }

    /// Appends a column and returns its index.
    pub fn add_column(&self, title: &str, width: i32) -> Result<u32> {
        insert_column(self.hwnd(), title, width)
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> u32 {
        let header = self.base.send(LVM_GETHEADER, 0, 0);
        if header == 0 {
            return 0;
        }
        let header = Hwnd::from_isize(header);
        opt_index(header.send_message(WndMsg::new(HDM_GETITEMCOUNT, 0, 0))).unwrap_or(0)
    }

    /// Appends a row; `texts[0]` is the item, the rest fill the subitems.
    /// Returns the new item's index.
    pub fn add_item(&self, texts: &[&str]) -> Result<u32> {
        let (first, rest) = texts
            .split_first()
            .ok_or_else(|| Error::custom("A list view item needs at least one text"))?;

        let mut wide = WideString::new(first);
        let mut lvi = LvItem {
            mask: LVIF_TEXT,
            item: i32::MAX,
            text: wide.as_ptr() as *mut u16,
            ..Default::default()
        };
        let idx = self.base.send(LVM_INSERTITEMW, 0, &mut lvi as *mut LvItem as isize);
        let idx = opt_index(idx).ok_or_else(|| Error::custom("LVM_INSERTITEMW failed"))?;

        for (sub, text) in rest.iter().enumerate() {
            wide = WideString::new(text);
            self.set_item_text_raw(idx, sub as u32 + 1, &wide)?;
        }
        Ok(idx)
    }

    /// Sets the text of an item (`sub_item` 0) or one of its subitems.
    pub fn set_item_text(&self, item: u32, sub_item: u32, text: &str) -> Result<()> {
        self.set_item_text_raw(item, sub_item, &WideString::new(text))
    }

    fn set_item_text_raw(&self, item: u32, sub_item: u32, text: &WideString) -> Result<()> {
        let mut lvi = LvItem {
            sub_item: sub_item as i32,
            text: text.as_ptr() as *mut u16,
            ..Default::default()
        };
        if self.base.send(LVM_SETITEMTEXTW, item as usize, &mut lvi as *mut LvItem as isize) == 0 {
            return Err(Error::not_found(format!("No item {item}/{sub_item}")));
        }
        Ok(())
    }

    /// Returns the text of an item or subitem.
    pub fn item_text(&self, item: u32, sub_item: u32) -> Result<String> {
        if item >= self.item_count() {
            return Err(Error::not_found(format!("No item at index {item}")));
        }
        // The message does not report truncation, so grow until the text fits.
        let mut cap = 64usize;
        loop {
            let mut buf = WideBuf::new(cap);
            let mut lvi = LvItem {
                sub_item: sub_item as i32,
                text: buf.as_mut_ptr(),
                text_max: buf.capacity() as i32,
                ..Default::default()
            };
            let len = self.base.send(LVM_GETITEMTEXTW, item as usize, &mut lvi as *mut LvItem as isize);
            if (len as usize) < cap {
                return buf.to_string();
            }
            cap *= 2;
        }
    }

    /// Returns the number of items.
    pub fn item_count(&self) -> u32 {
        opt_index(self.base.send(LVM_GETITEMCOUNT, 0, 0)).unwrap_or(0)
    }

    /// Returns the indexes of the selected items, in order.
    pub fn selected_items(&self) -> Vec<u32> {
        let mut out = Vec::new();
        let mut from = -1isize;
        loop {
            let next = self.base.send(LVM_GETNEXTITEM, from as usize, LVNI_SELECTED as isize);
            match opt_index(next) {
                Some(i) => {
                    out.push(i);
                    from = next;
                }
                None => return out,
            }
        }
    }

    /// Selects or deselects an item; `None` applies to every item.
    pub fn set_selected(&self, item: Option<u32>, selected: bool) -> Result<()> {
        let mut lvi = LvItem {
            state: if selected { LVIS_SELECTED } else { 0 },
            state_mask: LVIS_SELECTED,
            ..Default::default()
        };
        let at = item.map_or(usize::MAX, |i| i as usize);
        if self.base.send(LVM_SETITEMSTATE, at, &mut lvi as *mut LvItem as isize) == 0 {
            return Err(Error::not_found(format!("Cannot change selection of item {item:?}")));
        }
        Ok(())
    }

    /// Removes an item.
    pub fn delete_item(&self, item: u32) -> Result<()> {
        if self.base.send(LVM_DELETEITEM, item as usize, 0) == 0 {
            return Err(Error::not_found(format!("No item at index {item}")));
        }
        Ok(())
    }

    /// Removes every item; the columns stay.
    pub fn delete_all_items(&self) {
        self.base.send(LVM_DELETEALLITEMS, 0, 0);
    }

    /// Turns extended style bits on or off, leaving the others as they are.
    pub fn set_extended_style(&self, bits: u32, enable: bool) {
        let value = if enable { bits } else { 0 };
        self.base
            .send(LVM_SETEXTENDEDLISTVIEWSTYLE, bits as usize, value as isize);
    }

    /// Returns the extended style bits.
    pub fn extended_style(&self) -> u32 {
        self.base.send(LVM_GETEXTENDEDLISTVIEWSTYLE, 0, 0) as u32
    }
}

fn insert_column(hwnd: Hwnd, title: &str, width: i32) -> Result<u32> {
    let wide = WideString::new(title);
    let count = {
        let header = Hwnd::from_isize(hwnd.send_message(WndMsg::new(LVM_GETHEADER, 0, 0)));
        header.send_message(WndMsg::new(HDM_GETITEMCOUNT, 0, 0)).max(0) as usize
    };
    let col = LvColumn {
        mask: LVCF_TEXT | LVCF_WIDTH,
        fmt: 0,
        cx: width,
        text: wide.as_ptr(),
        text_max: 0,
        sub_item: 0,
        image: 0,
        order: 0,
        cx_min: 0,
        cx_default: 0,
        cx_ideal: 0,
    };
    let idx = hwnd.send_message(WndMsg::new(LVM_INSERTCOLUMNW, count, &col as *const LvColumn as isize));
    opt_index(idx).ok_or_else(|| Error::custom("LVM_INSERTCOLUMNW failed"))
}

/// Notification registration for a [`ListView`].
pub struct ListViewEvents<'a> {
    parent: &'a WindowEvents,
    ctrl_id: u16,
}

impl ListViewEvents<'_> {
    /// `LVN_ITEMCHANGED`, after an item's state or text changed.
    pub fn lvn_item_changed<F>(&self, f: F)
    where
        F: Fn(&NmListView) -> Result<()> + 'static,
    {
        self.parent.wm_notify(self.ctrl_id, LVN_ITEMCHANGED, move |p| {
            // SAFETY: the list view sends an NMLISTVIEW with this code.
            f(unsafe { p.cast::<NmListView>() })?;
            Ok(0)
        });
    }

    /// `LVN_COLUMNCLICK`; the column is in `sub_item`.
    pub fn lvn_column_click<F>(&self, f: F)
    where
        F: Fn(&NmListView) -> Result<()> + 'static,
    {
        self.parent.wm_notify(self.ctrl_id, LVN_COLUMNCLICK, move |p| {
            // SAFETY: the list view sends an NMLISTVIEW with this code.
            f(unsafe { p.cast::<NmListView>() })?;
            Ok(0)
        });
    }

    /// `LVN_KEYDOWN`, with the virtual-key code.
    pub fn lvn_key_down<F>(&self, f: F)
    where
        F: Fn(u16) -> Result<()> + 'static,
    {
        self.parent.wm_notify(self.ctrl_id, LVN_KEYDOWN, move |p| {
            // SAFETY: the list view sends an NMLVKEYDOWN with this code.
            let kd = unsafe { p.cast::<NmLvKeyDown>() };
            let vkey = kd.vkey;
            f(vkey)?;
            Ok(0)
        });
    }

    /// `NM_CLICK`.
    pub fn nm_click<F>(&self, f: F)
    where
        F: Fn(&NmItemActivate) -> Result<()> + 'static,
    {
        self.item_activate(nm::CLICK, f);
    }

    /// `NM_DBLCLK`.
    pub fn nm_dbl_clk<F>(&self, f: F)
    where
        F: Fn(&NmItemActivate) -> Result<()> + 'static,
    {
        self.item_activate(nm::DBLCLK, f);
    }

    /// `NM_RCLICK`.
    pub fn nm_r_click<F>(&self, f: F)
    where
        F: Fn(&NmItemActivate) -> Result<()> + 'static,
    {
        self.item_activate(nm::RCLICK, f);
    }

    fn item_activate<F>(&self, code: i32, f: F)
    where
        F: Fn(&NmItemActivate) -> Result<()> + 'static,
    {
        self.parent.wm_notify(self.ctrl_id, code, move |p| {
            // SAFETY: list views send an NMITEMACTIVATE with click codes.
            f(unsafe { p.cast::<NmItemActivate>() })?;
            Ok(0)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util;
    use super::*;
    use crate::msg;
    use std::cell::Cell;

    fn report() -> (crate::window::WindowMain, ListView) {
        let wnd = test_util::parent();
        let lv = ListView::new(
            &wnd,
            ListViewOpts {
                columns: vec![("Name".to_owned(), 120), ("Size".to_owned(), 60)],
                ..Default::default()
            },
        )
        .unwrap();
        wnd.create().unwrap();
        (wnd, lv)
    }

    #[test]
    fn test_rows_and_columns() {
        let (wnd, lv) = report();
        assert_eq!(lv.column_count(), 2);
        assert_eq!(lv.add_column("Kind", 80).unwrap(), 2);
        assert_eq!(lv.column_count(), 3);

        assert_eq!(lv.add_item(&["a.txt", "10", "text"]).unwrap(), 0);
        assert_eq!(lv.add_item(&["b.bin", "2048"]).unwrap(), 1);
        assert!(lv.add_item(&[]).is_err());
        assert_eq!(lv.item_count(), 2);

        assert_eq!(lv.item_text(0, 2).unwrap(), "text");
        assert_eq!(lv.item_text(1, 1).unwrap(), "2048");
        let long = "x".repeat(300);
        lv.set_item_text(1, 0, &long).unwrap();
        assert_eq!(lv.item_text(1, 0).unwrap(), long);
        assert!(lv.item_text(5, 0).is_err());

        lv.delete_item(0).unwrap();
        assert_eq!(lv.item_text(0, 1).unwrap(), "2048");
        lv.delete_all_items();
        assert_eq!(lv.item_count(), 0);
        assert_eq!(lv.column_count(), 3);
        test_util::teardown(&wnd);
    }

    #[test]
    fn test_selection() {
        let (wnd, lv) = report();
        for name in ["one", "two", "three"] {
            lv.add_item(&[name]).unwrap();
        }
        let changes = Rc::new(Cell::new(0));
        let c = changes.clone();
        lv.on().lvn_item_changed(move |nm| {
            if nm.became_selected() {
                c.set(c.get() + 1);
            }
            Ok(())
        });

        assert!(lv.selected_items().is_empty());
        lv.set_selected(Some(0), true).unwrap();
        lv.set_selected(Some(2), true).unwrap();
        assert_eq!(lv.selected_items(), vec![0, 2]);
        assert_eq!(changes.get(), 2);
        lv.set_selected(None, false).unwrap();
        assert!(lv.selected_items().is_empty());
        test_util::teardown(&wnd);
    }

    #[test]
    fn test_extended_style() {
        let (wnd, lv) = report();
        assert_ne!(lv.extended_style() & ListView::EX_FULL_ROW_SELECT, 0);
        lv.set_extended_style(ListView::EX_GRID_LINES, true);
        lv.set_extended_style(ListView::EX_FULL_ROW_SELECT, false);
        let ex = lv.extended_style();
        assert_ne!(ex & ListView::EX_GRID_LINES, 0);
        assert_eq!(ex & ListView::EX_FULL_ROW_SELECT, 0);
        test_util::teardown(&wnd);
    }

    #[test]
    fn test_click_notification() {
        let (wnd, lv) = report();
        let clicked = Rc::new(Cell::new(None));
        let c = clicked.clone();
        lv.on().nm_dbl_clk(move |nm| {
            c.set(nm.item_index());
            Ok(())
        });

        let mut nm = NmItemActivate {
            hdr: NmHdr {
                hwnd_from: lv.hwnd().raw().0,
                id_from: lv.ctrl_id() as usize,
                code: nm::DBLCLK as u32,
            },
            item: 4,
            sub_item: 0,
            new_state: 0,
            old_state: 0,
            changed: 0,
            pt_action: POINT::default(),
            lparam: 0,
            key_flags: 0,
        };
        wnd.hwnd().send_message(WndMsg::new(
            msg::WM_NOTIFY,
            lv.ctrl_id() as usize,
            &mut nm as *mut NmItemActivate as isize,
        ));
        assert_eq!(clicked.get(), Some(4));
        test_util::teardown(&wnd);
    }
}
