//! A single linear compute job: one kernel over one buffer.
//!
//! [`ComputeJob::run`] walks every [`Stage`] in order inside a fresh
//! [`ObjectArena`](crate::ObjectArena) and stops at the first failure.

use std::fmt;

use crate::bytes::{AsBytes, Element};
use crate::error::{ComputeError, Result};
use crate::kernel::KernelSource;
use crate::options::CompileOptions;
use crate::slots::MAX_BUFFER_BINDINGS;
use crate::stage::Stage;

/// How the job's threadgroups are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchForm {
    /// The one-dimensional convenience form.
    #[default]
    Linear,
    /// The general three-axis form with Y and Z set to 1.
    Grid,
}

/// Everything needed to run one kernel over one buffer of `T`.
#[derive(Debug, Clone)]
pub struct ComputeJob<T: Element> {
    pub kernel: KernelSource,
    pub entry_point: String,
    pub options: CompileOptions,
    /// Initial buffer contents; the output has the same length.
    pub input: Vec<T>,
    /// Inline parameter bytes, bound with `set_bytes`.
    pub params: Option<Vec<u8>>,
    pub data_index: usize,
    pub params_index: usize,
    pub threads_per_threadgroup: usize,
    pub dispatch: DispatchForm,
}

impl<T: Element> ComputeJob<T> {
    /// A job with the data buffer at slot 0, parameters at slot 1 and one
    /// thread per threadgroup.
    pub fn new(kernel: KernelSource, entry_point: impl Into<String>, input: Vec<T>) -> Self {
        Self {
            kernel,
            entry_point: entry_point.into(),
            options: CompileOptions::default(),
            input,
            params: None,
            data_index: 0,
            params_index: 1,
            threads_per_threadgroup: 1,
            dispatch: DispatchForm::Linear,
        }
    }

    pub fn with_params<P: AsBytes>(mut self, params: &P) -> Self {
        self.params = Some(params.as_bytes().to_vec());
        self
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_threads_per_threadgroup(mut self, threads: usize) -> Self {
        self.threads_per_threadgroup = threads;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchForm) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Move the data buffer and parameters to other slots.
    pub fn with_slots(mut self, data_index: usize, params_index: usize) -> Self {
        self.data_index = data_index;
        self.params_index = params_index;
        self
    }

    /// Both slots must be in the argument table, and parameters may not
    /// share the data buffer's slot.
    pub fn check_slots(&self) -> Result<()> {
        let mut used = vec![self.data_index];
        if self.params.is_some() {
            used.push(self.params_index);
        }
        for &index in &used {
            if index >= MAX_BUFFER_BINDINGS {
                return Err(ComputeError::InvalidBinding {
                    index,
                    max: MAX_BUFFER_BINDINGS,
                });
            }
        }
        if self.params.is_some() && self.data_index == self.params_index {
            return Err(ComputeError::BindingConflict {
                index: self.data_index,
            });
        }
        Ok(())
    }
}

/// What one completed stage produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub detail: String,
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.detail)
    }
}

/// Result of a successful [`ComputeJob::run`].
#[derive(Debug, Clone)]
pub struct JobOutput<T> {
    pub device_name: String,
    pub output: Vec<T>,
    pub stages: Vec<StageReport>,
}

#[cfg(target_os = "macos")]
mod run {
    use tracing::info;

    use super::*;
    use crate::arena::ObjectArena;
    use crate::buffer::Buffer;
    use crate::command::CommandBuffer;
    use crate::grid::GridSize;
    use crate::handle::{Device, PipelineState};
    use crate::kernel::LibraryInput;
    use crate::options::StorageMode;
    use crate::stage::{StageContext, StageError};

    fn record(stages: &mut Vec<StageReport>, stage: Stage, detail: String) {
        info!(%stage, %detail, "stage complete");
        stages.push(StageReport { stage, detail });
    }

    impl<T: Element> ComputeJob<T> {
        /// Run every stage, aborting at the first one that fails.
        pub fn run(&self) -> std::result::Result<JobOutput<T>, StageError> {
            let mut stages = Vec::new();

            self.check_slots().stage(Stage::Configure)?;
            let threadgroups = GridSize::covering(self.input.len(), self.threads_per_threadgroup)
                .stage(Stage::Configure)?;
            let prepared = self.kernel.prepare(&self.entry_point).stage(Stage::Configure)?;
            record(
                &mut stages,
                Stage::Configure,
                format!(
                    "{} kernel `{}`, {} threadgroups of {}",
                    self.kernel.kind(),
                    prepared.entry_point,
                    threadgroups,
                    self.threads_per_threadgroup
                ),
            );

            let arena = ObjectArena::new();

            let device = Device::system_default(&arena).stage(Stage::CreateDevice)?;
            let device_name = device.name().stage(Stage::CreateDevice)?;
            record(&mut stages, Stage::CreateDevice, format!("{device:?} {device_name}"));

            let queue = device.new_command_queue().stage(Stage::CreateCommandQueue)?;
            record(&mut stages, Stage::CreateCommandQueue, format!("{queue:?}"));

            let library = match &prepared.library {
                LibraryInput::Source(source) => device.new_library_with_source(source, &self.options),
                LibraryInput::Data(bytes) => device.new_library_with_data(bytes),
                LibraryInput::Default => device.new_default_library(),
            }
            .stage(Stage::CompileLibrary)?;
            record(&mut stages, Stage::CompileLibrary, format!("{library:?}"));

            let function = library
                .new_function(&prepared.entry_point)
                .stage(Stage::LookupFunction)?;
            record(&mut stages, Stage::LookupFunction, format!("{function:?}"));

            let pipeline = device
                .new_compute_pipeline_state(&function)
                .stage(Stage::BuildPipelineState)?;
            record(&mut stages, Stage::BuildPipelineState, format!("{pipeline:?}"));

            let length = std::mem::size_of_val(self.input.as_slice());
            let buffer = device
                .new_buffer(length, StorageMode::Shared)
                .stage(Stage::AllocateBuffer)?;
            record(&mut stages, Stage::AllocateBuffer, format!("{:?} ({length} bytes)", buffer.as_ptr()));

            buffer.write(&self.input).stage(Stage::WriteInput)?;
            record(&mut stages, Stage::WriteInput, format!("{} elements", self.input.len()));

            let mut command_buffer = queue.command_buffer().stage(Stage::CreateCommandBuffer)?;
            record(&mut stages, Stage::CreateCommandBuffer, "recording".to_string());

            self.encode(&mut command_buffer, &pipeline, &buffer, threadgroups)
                .stage(Stage::Encode)?;
            record(&mut stages, Stage::Encode, format!("{:?} dispatch", self.dispatch));

            let committed = command_buffer.commit().stage(Stage::Commit)?;
            record(&mut stages, Stage::Commit, "submitted".to_string());

            committed.wait_until_completed().stage(Stage::WaitUntilCompleted)?;
            record(&mut stages, Stage::WaitUntilCompleted, "completed".to_string());

            let output = buffer.read::<T>().stage(Stage::ReadOutput)?;
            record(&mut stages, Stage::ReadOutput, format!("{} elements", output.len()));

            Ok(JobOutput {
                device_name,
                output,
                stages,
            })
        }

        fn encode<'a>(
            &self,
            command_buffer: &mut CommandBuffer<'a>,
            pipeline: &PipelineState<'a>,
            buffer: &Buffer<'a>,
            threadgroups: usize,
        ) -> Result<()> {
            let mut encoder = command_buffer.compute_encoder()?;
            encoder.set_compute_pipeline_state(pipeline)?;
            encoder.set_buffer(buffer, 0, self.data_index)?;
            if let Some(params) = &self.params {
                encoder.set_bytes(params, self.params_index)?;
            }
            match self.dispatch {
                DispatchForm::Linear => {
                    encoder.dispatch_threadgroups_1d(threadgroups, self.threads_per_threadgroup)?
                }
                DispatchForm::Grid => encoder.dispatch_threadgroups(
                    GridSize::new(threadgroups, 1, 1),
                    GridSize::new(self.threads_per_threadgroup, 1, 1),
                )?,
            }
            encoder.end_encoding()
        }
    }
}
