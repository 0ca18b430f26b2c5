/// Fire-and-forget notification dispatch (SMS/email transport lives outside
/// this service). Delivery is never retried here; the body is not logged
/// because it can carry one-time codes.
#[derive(Clone, Default)]
pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        Self
    }

    pub fn send(&self, to: &str, subject: &str, body: &str) {
        let _ = body;
        log::info!("notification dispatched to={} subject=\"{}\"", to, subject);
    }
}
