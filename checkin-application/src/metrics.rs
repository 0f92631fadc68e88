use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    sync_runs: AtomicU64,
    sync_skipped: AtomicU64,
    payloads_stored: AtomicU64,
    check_ins_recorded: AtomicU64,
    check_ins_rejected: AtomicU64,
    scans_uploaded: AtomicU64,
    upload_failures: AtomicU64,
}

impl Metrics {
    pub fn record_sync(&self, payload_count: usize) {
        self.sync_runs.fetch_add(1, Ordering::Relaxed);
        self.payloads_stored
            .fetch_add(payload_count as u64, Ordering::Relaxed);
    }

    pub fn record_sync_skipped(&self) {
        self.sync_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_check_in(&self) {
        self.check_ins_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_check_in_rejected(&self) {
        self.check_ins_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload(&self, resolved: usize) {
        self.scans_uploaded
            .fetch_add(resolved as u64, Ordering::Relaxed);
    }

    pub fn record_upload_failed(&self) {
        self.upload_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scans_uploaded(&self) -> u64 {
        self.scans_uploaded.load(Ordering::Relaxed)
    }

    pub fn check_ins_recorded(&self) -> u64 {
        self.check_ins_recorded.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let runs = self.sync_runs.load(Ordering::Relaxed);
        let skipped = self.sync_skipped.load(Ordering::Relaxed);
        let payloads = self.payloads_stored.load(Ordering::Relaxed);
        let recorded = self.check_ins_recorded.load(Ordering::Relaxed);
        let rejected = self.check_ins_rejected.load(Ordering::Relaxed);
        let uploaded = self.scans_uploaded.load(Ordering::Relaxed);
        let upload_failures = self.upload_failures.load(Ordering::Relaxed);

        format!(
            "# TYPE alfio_checkin_sync_runs_total counter\n\
alfio_checkin_sync_runs_total {}\n\
# TYPE alfio_checkin_sync_skipped_total counter\n\
alfio_checkin_sync_skipped_total {}\n\
# TYPE alfio_checkin_payloads_stored_total counter\n\
alfio_checkin_payloads_stored_total {}\n\
# TYPE alfio_checkin_check_ins_recorded_total counter\n\
alfio_checkin_check_ins_recorded_total {}\n\
# TYPE alfio_checkin_check_ins_rejected_total counter\n\
alfio_checkin_check_ins_rejected_total {}\n\
# TYPE alfio_checkin_scans_uploaded_total counter\n\
alfio_checkin_scans_uploaded_total {}\n\
# TYPE alfio_checkin_upload_failures_total counter\n\
alfio_checkin_upload_failures_total {}\n",
            runs, skipped, payloads, recorded, rejected, uploaded, upload_failures
        )
    }
}
