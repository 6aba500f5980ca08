//! Named steps of a compute job, used to report where a job stopped.

use std::fmt;

use crate::error::ComputeError;

/// One step of the create, compile, encode, submit, read sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Configure,
    CreateDevice,
    CreateCommandQueue,
    CompileLibrary,
    LookupFunction,
    BuildPipelineState,
    AllocateBuffer,
    WriteInput,
    CreateCommandBuffer,
    Encode,
    Commit,
    WaitUntilCompleted,
    ReadOutput,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Configure => "configure",
            Stage::CreateDevice => "create device",
            Stage::CreateCommandQueue => "create command queue",
            Stage::CompileLibrary => "compile library",
            Stage::LookupFunction => "look up function",
            Stage::BuildPipelineState => "build pipeline state",
            Stage::AllocateBuffer => "allocate buffer",
            Stage::WriteInput => "write input",
            Stage::CreateCommandBuffer => "create command buffer",
            Stage::Encode => "encode",
            Stage::Commit => "commit",
            Stage::WaitUntilCompleted => "wait until completed",
            Stage::ReadOutput => "read output",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failure attributed to the stage that produced it.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: ComputeError,
}

/// Attach a [`Stage`] to a fallible result.
pub trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T, StageError>;
}

impl<T, E: Into<ComputeError>> StageContext<T> for Result<T, E> {
    fn stage(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|e| StageError {
            stage,
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_errors_name_the_stage() {
        let result: Result<(), ComputeError> = Err(ComputeError::Compile {
            diagnostic: "expected ';'".into(),
        });
        let err = result.stage(Stage::CompileLibrary).unwrap_err();
        assert_eq!(err.stage, Stage::CompileLibrary);
        assert_eq!(
            err.to_string(),
            "compile library failed: kernel compilation failed: expected ';'"
        );
    }

    #[test]
    fn successes_pass_through() {
        let result: Result<u32, ComputeError> = Ok(7);
        assert_eq!(result.stage(Stage::ReadOutput).unwrap(), 7);
    }

    #[test]
    fn source_is_preserved() {
        use std::error::Error;

        let result: Result<(), ComputeError> = Err(ComputeError::NoDevice);
        let err = result.stage(Stage::CreateDevice).unwrap_err();
        assert_eq!(err.source().unwrap().to_string(), "no Metal device is available");
    }
}
