//! Interface strings in Vietnamese and English

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Vi,
    En,
}

impl Lang {
    /// Choose between a Vietnamese and an English literal
    pub fn pick(self, vi: &'static str, en: &'static str) -> &'static str {
        match self {
            Lang::Vi => vi,
            Lang::En => en,
        }
    }
}

/// Every translated message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg {
    SignIn,
    SignOut,
    Email,
    Password,
    SignInFailed,
    SignedIn,
    SignedOut,
    Loading,
    AccessDenied,
    AccessDeniedDetail,
    LoadFailed,
    Saved,
    SaveFailed,
    Deleted,
    DeleteFailed,
    ConfirmDelete,
    RequiredFields,
    PasswordMismatch,
    PasswordChanged,
    ResetSent,
    ExportDone,
    ExportFailed,
    PhotoUploaded,
    RoleChanged,
    AccountsCreated,
    SettingsSaved,
    SettingsReset,
    Connected,
    Disconnected,
    NoData,
    AllClasses,
    AllStatuses,
    Search,
    Previous,
    Next,
}

impl Msg {
    pub fn text(self, lang: Lang) -> &'static str {
        match lang {
            Lang::Vi => self.vi(),
            Lang::En => self.en(),
        }
    }

    fn vi(self) -> &'static str {
        match self {
            Msg::SignIn => "Đăng nhập",
            Msg::SignOut => "Đăng xuất",
            Msg::Email => "Email",
            Msg::Password => "Mật khẩu",
            Msg::SignInFailed => "Đăng nhập thất bại",
            Msg::SignedIn => "Đăng nhập thành công",
            Msg::SignedOut => "Đã đăng xuất",
            Msg::Loading => "Đang tải...",
            Msg::AccessDenied => "Không có quyền truy cập",
            Msg::AccessDeniedDetail => "Tài khoản của bạn không được phép xem trang này.",
            Msg::LoadFailed => "Không thể tải dữ liệu",
            Msg::Saved => "Đã lưu",
            Msg::SaveFailed => "Lưu thất bại",
            Msg::Deleted => "Đã xóa",
            Msg::DeleteFailed => "Xóa thất bại",
            Msg::ConfirmDelete => "Bạn có chắc muốn xóa?",
            Msg::RequiredFields => "Vui lòng điền đầy đủ thông tin bắt buộc",
            Msg::PasswordMismatch => "Mật khẩu xác nhận không khớp",
            Msg::PasswordChanged => "Đã đổi mật khẩu",
            Msg::ResetSent => "Đã gửi hướng dẫn đặt lại mật khẩu",
            Msg::ExportDone => "Đã xuất báo cáo",
            Msg::ExportFailed => "Xuất báo cáo thất bại",
            Msg::PhotoUploaded => "Đã tải ảnh lên",
            Msg::RoleChanged => "Đã cập nhật vai trò",
            Msg::AccountsCreated => "Đã tạo tài khoản phụ huynh",
            Msg::SettingsSaved => "Đã lưu cài đặt",
            Msg::SettingsReset => "Đã khôi phục cài đặt mặc định",
            Msg::Connected => "Đã kết nối",
            Msg::Disconnected => "Mất kết nối",
            Msg::NoData => "Không có dữ liệu",
            Msg::AllClasses => "Tất cả các lớp",
            Msg::AllStatuses => "Tất cả trạng thái",
            Msg::Search => "Tìm kiếm",
            Msg::Previous => "Trước",
            Msg::Next => "Sau",
        }
    }

    fn en(self) -> &'static str {
        match self {
            Msg::SignIn => "Sign in",
            Msg::SignOut => "Sign out",
            Msg::Email => "Email",
            Msg::Password => "Password",
            Msg::SignInFailed => "Sign-in failed",
            Msg::SignedIn => "Signed in",
            Msg::SignedOut => "Signed out",
            Msg::Loading => "Loading...",
            Msg::AccessDenied => "Access denied",
            Msg::AccessDeniedDetail => "Your account is not allowed to view this page.",
            Msg::LoadFailed => "Could not load data",
            Msg::Saved => "Saved",
            Msg::SaveFailed => "Save failed",
            Msg::Deleted => "Deleted",
            Msg::DeleteFailed => "Delete failed",
            Msg::ConfirmDelete => "Are you sure you want to delete this?",
            Msg::RequiredFields => "Please fill in all required fields",
            Msg::PasswordMismatch => "Password confirmation does not match",
            Msg::PasswordChanged => "Password changed",
            Msg::ResetSent => "Password reset instructions sent",
            Msg::ExportDone => "Report exported",
            Msg::ExportFailed => "Export failed",
            Msg::PhotoUploaded => "Photo uploaded",
            Msg::RoleChanged => "Role updated",
            Msg::AccountsCreated => "Parent accounts created",
            Msg::SettingsSaved => "Settings saved",
            Msg::SettingsReset => "Settings restored to defaults",
            Msg::Connected => "Connected",
            Msg::Disconnected => "Disconnected",
            Msg::NoData => "No data",
            Msg::AllClasses => "All classes",
            Msg::AllStatuses => "All statuses",
            Msg::Search => "Search",
            Msg::Previous => "Previous",
            Msg::Next => "Next",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_language_is_vietnamese() {
        assert_eq!(Lang::default(), Lang::Vi);
        assert_eq!(Msg::SignIn.text(Lang::default()), "Đăng nhập");
    }

    #[test]
    fn test_english() {
        assert_eq!(Msg::PasswordMismatch.text(Lang::En), "Password confirmation does not match");
    }

    #[test]
    fn test_pick() {
        assert_eq!(Lang::Vi.pick("Lớp", "Class"), "Lớp");
        assert_eq!(Lang::En.pick("Lớp", "Class"), "Class");
    }
}
