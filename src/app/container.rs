use std::sync::Arc;

use crate::adapters::{EncodeLibavAdapter, FsLocalAdapter, ProbeLibavAdapter, TracingLogAdapter};
use crate::app::{
    plan_interactor::PlanInteractor, preview_interactor::PreviewInteractor,
    segment_interactor::SegmentInteractor,
};
use crate::domain::errors::DomainError;
use crate::ports::{ConfigPort, EncodePort, FsPort, LogPort, ProbePort};

pub trait AppContainer: Send + Sync {
    fn segment_interactor(&self) -> Arc<SegmentInteractor>;
    fn plan_interactor(&self) -> Arc<PlanInteractor>;
    fn preview_interactor(&self) -> Arc<PreviewInteractor>;
    fn config(&self) -> Arc<dyn ConfigPort>;
}

pub struct DefaultAppContainer {
    config_port: Arc<dyn ConfigPort>,
    segment_interactor: Arc<SegmentInteractor>,
    plan_interactor: Arc<PlanInteractor>,
    preview_interactor: Arc<PreviewInteractor>,
}

impl DefaultAppContainer {
    /// Wire the libav and local filesystem adapters around an
    /// already-initialised configuration
    pub fn with_config(config_port: Arc<dyn ConfigPort>) -> Result<Self, DomainError> {
        let probe_port = Arc::new(ProbeLibavAdapter::new()?);
        let encode_port = Arc::new(EncodeLibavAdapter::new()?);
        let fs_port = Arc::new(FsLocalAdapter::new()?);
        let log_port = Arc::new(TracingLogAdapter::new()?);

        let segment_interactor = Arc::new(SegmentInteractor::new(
            Arc::clone(&probe_port) as Arc<dyn ProbePort>,
            Arc::clone(&encode_port) as Arc<dyn EncodePort>,
            Arc::clone(&fs_port) as Arc<dyn FsPort>,
            Arc::clone(&config_port),
            Arc::clone(&log_port) as Arc<dyn LogPort>,
        ));

        let plan_interactor = Arc::new(PlanInteractor::new(
            Arc::clone(&probe_port) as Arc<dyn ProbePort>,
            Arc::clone(&fs_port) as Arc<dyn FsPort>,
            Arc::clone(&config_port),
            Arc::clone(&log_port) as Arc<dyn LogPort>,
        ));

        let preview_interactor = Arc::new(PreviewInteractor::new(
            Arc::clone(&probe_port) as Arc<dyn ProbePort>,
            Arc::clone(&encode_port) as Arc<dyn EncodePort>,
            Arc::clone(&fs_port) as Arc<dyn FsPort>,
            Arc::clone(&config_port),
            Arc::clone(&log_port) as Arc<dyn LogPort>,
        ));

        Ok(Self {
            config_port,
            segment_interactor,
            plan_interactor,
            preview_interactor,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn segment_interactor(&self) -> Arc<SegmentInteractor> {
        Arc::clone(&self.segment_interactor)
    }

    fn plan_interactor(&self) -> Arc<PlanInteractor> {
        Arc::clone(&self.plan_interactor)
    }

    fn preview_interactor(&self) -> Arc<PreviewInteractor> {
        Arc::clone(&self.preview_interactor)
    }

    fn config(&self) -> Arc<dyn ConfigPort> {
        Arc::clone(&self.config_port)
    }
}
