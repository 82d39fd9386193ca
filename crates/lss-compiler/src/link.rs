//! Static call resolution
//!
//! Function bodies are compiled before the code layout is known, so calls to
//! script functions are emitted as [`Instruction::UnresolvedCall`]. Once every
//! body exists they are rewritten to [`Instruction::CallFunction`] with the
//! callee's absolute code offset. Both forms have the same size, so linking
//! never shifts any offset.

use osi_bytecode::{CodeOffset, Instruction, OsiFile};
use rustc_hash::FxHashMap;

use crate::error::{CompileError, CompileResult};

/// Rewrite every pending static call in `file`
pub fn link(file: &mut OsiFile) -> CompileResult<()> {
    let targets: FxHashMap<String, u32> = file
        .functions
        .iter()
        .zip(file.function_offsets())
        .map(|(f, offset)| (f.name.clone(), offset))
        .collect();

    let streams = file
        .functions
        .iter_mut()
        .map(|f| &mut f.instructions)
        .chain(
            file.classes
                .iter_mut()
                .flat_map(|c| c.methods.iter_mut().map(|m| &mut m.instructions)),
        );

    for stream in streams {
        for instruction in stream.iter_mut() {
            if let Instruction::UnresolvedCall { function, argc } = instruction {
                let target = targets
                    .get(function.as_str())
                    .ok_or_else(|| CompileError::internal(format!("call to unregistered function '{function}'")))?;
                *instruction = Instruction::CallFunction {
                    target: CodeOffset(*target),
                    argc: *argc,
                };
            }
        }
    }
    Ok(())
}
