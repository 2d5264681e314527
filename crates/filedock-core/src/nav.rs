//! 导航菜单与图片预览弹窗状态

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavMenu {
    /// 移动端菜单是否展开
    pub expanded: bool,
    /// 当前激活的链接
    pub active: Option<String>,
}

impl NavMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
    }

    /// 标记与当前位置相同的链接，没有匹配时清除
    pub fn set_active<'a, I>(&mut self, current: &str, links: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.active = links
            .into_iter()
            .find(|link| *link == current)
            .map(str::to_string);
    }

    pub fn is_active(&self, link: &str) -> bool {
        self.active.as_deref() == Some(link)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageModal {
    open: bool,
    src: String,
    caption: String,
}

impl ImageModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, src: impl Into<String>, alt: impl Into<String>) {
        self.src = src.into();
        self.caption = alt.into();
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// 点击落在背景上时才关闭
    pub fn close_if_backdrop(&mut self, target_is_backdrop: bool) {
        if target_is_backdrop {
            self.close();
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_menu() {
        let mut menu = NavMenu::new();
        menu.toggle();
        assert!(menu.expanded);
        menu.toggle();
        assert!(!menu.expanded);

        let links = ["/", "/files", "/image-hosting"];
        menu.set_active("/files", links);
        assert!(menu.is_active("/files"));
        assert!(!menu.is_active("/"));

        menu.set_active("/nowhere", links);
        assert_eq!(menu.active, None);
    }

    #[test]
    fn test_image_modal() {
        let mut modal = ImageModal::new();
        assert!(!modal.is_open());

        modal.show("/d/1:a", "a.png");
        assert!(modal.is_open());
        assert_eq!(modal.caption(), "a.png");

        // 点击图片本身不关闭
        modal.close_if_backdrop(false);
        assert!(modal.is_open());

        modal.close_if_backdrop(true);
        assert!(!modal.is_open());
        assert_eq!(modal.src(), "/d/1:a");
    }
}
