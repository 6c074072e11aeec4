// File: src/status.rs
// Block status badges

/// Display title and badge class for a block status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDescriptor {
    pub title: &'static str,
    pub badge_class: &'static str,
}

/// Status codes 1..=7, in order
pub const STATUS_DESCRIPTORS: [StatusDescriptor; 7] = [
    StatusDescriptor { title: "Success", badge_class: "success" },
    StatusDescriptor { title: "Pending", badge_class: "brand" },
    StatusDescriptor { title: "Delivered", badge_class: "metal" },
    StatusDescriptor { title: "Canceled", badge_class: "primary" },
    StatusDescriptor { title: "Info", badge_class: "info" },
    StatusDescriptor { title: "Danger", badge_class: "danger" },
    StatusDescriptor { title: "Warning", badge_class: "warning" },
];

pub const STATUS_SUCCESS: i64 = 1;
pub const STATUS_PENDING: i64 = 2;

/// Look up the descriptor for `code`; `None` outside 1..=7
pub fn describe(code: i64) -> Option<&'static StatusDescriptor> {
    if code < 1 {
        return None;
    }
    usize::try_from(code - 1)
        .ok()
        .and_then(|index| STATUS_DESCRIPTORS.get(index))
}
