use crate::ast::ExtensionMetadata;
use crate::descriptor::DISPATCH_FUNC;
use crate::fragments::{Fragment, Fragments};
use crate::js::{quote, spaces, JsExpr};
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const ERROR_STUB_MESSAGE: &str =
    "This block only runs in compiled projects; enable the compiler and try again.";

/// Host prototype whose compiler hooks get intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostObject {
    JsGenerator,
    ScriptTreeGenerator,
}

impl HostObject {
    pub fn binding(self) -> &'static str {
        match self {
            HostObject::JsGenerator => "JSGP",
            HostObject::ScriptTreeGenerator => "STGP",
        }
    }

    /// Parameter name of the hook and the expression the switch dispatches on.
    fn dispatch(self) -> (&'static str, &'static str) {
        match self {
            HostObject::JsGenerator => ("node", "node.kind"),
            HostObject::ScriptTreeGenerator => ("block", "block.opcode"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    DescendStackedBlock,
    DescendInput,
}

impl Hook {
    pub fn method(self) -> &'static str {
        match self {
            Hook::DescendStackedBlock => "descendStackedBlock",
            Hook::DescendInput => "descendInput",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HookReplacement<'a> {
    pub hook: Hook,
    pub cases: &'a Fragment,
}

/// Replacement hooks for one host object.
///
/// Each hook is a switch over the fragment's case keys whose `default`
/// forwards to the original method. A hook is installed at most once per
/// target; the emitted installer keeps the same guarantee at load time.
#[derive(Debug, Clone)]
pub struct Patch<'a> {
    pub target: HostObject,
    hooks: Vec<HookReplacement<'a>>,
}

impl<'a> Patch<'a> {
    pub fn new(target: HostObject) -> Self {
        Self {
            target,
            hooks: Vec::new(),
        }
    }

    /// Returns false, leaving the first replacement in place, if `hook` is already installed.
    pub fn install(&mut self, hook: Hook, cases: &'a Fragment) -> bool {
        if self.hooks.iter().any(|h| h.hook == hook) {
            return false;
        }
        self.hooks.push(HookReplacement { hook, cases });
        true
    }

    pub fn hooks(&self) -> &[HookReplacement<'a>] {
        &self.hooks
    }

    pub fn render(&self, indent: usize) -> String {
        let (param, dispatch_on) = self.target.dispatch();
        let pad = spaces(indent);
        let mut out = format!("{}cst_patch({}, {{\n", pad, self.target.binding());
        for (idx, replacement) in self.hooks.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            let inner = spaces(indent + 2);
            let body = spaces(indent + 4);
            out.push_str(&format!(
                "{}{}(fn, {}, ...args) {{\n",
                inner,
                replacement.hook.method(),
                param
            ));
            if self.target == HostObject::JsGenerator && replacement.hook == Hook::DescendStackedBlock {
                out.push_str(&format!("{}const block = node.block;\n", body));
            }
            out.push_str(&format!("{}switch ({}) {{\n", body, dispatch_on));
            out.push_str(&replacement.cases.render(indent + 6));
            out.push_str(&format!(
                "{}  default:\n{}    return fn({}, ...args);\n{}}}\n",
                body, body, param, body
            ));
            out.push_str(&format!("{}}},\n", inner));
        }
        out.push_str(&format!("{}}});\n", pad));
        out
    }
}

/// Patches for the text backend: statements and expressions.
pub fn js_generator_patch(fragments: &Fragments) -> Patch<'_> {
    let mut patch = Patch::new(HostObject::JsGenerator);
    patch.install(Hook::DescendStackedBlock, &fragments.statement);
    patch.install(Hook::DescendInput, &fragments.expression);
    patch
}

/// Patches for the tree builder: stacked blocks and inputs.
pub fn script_tree_patch(fragments: &Fragments) -> Patch<'_> {
    let mut patch = Patch::new(HostObject::ScriptTreeGenerator);
    patch.install(Hook::DescendStackedBlock, &fragments.tree_build);
    patch.install(Hook::DescendInput, &fragments.tree_input);
    patch
}

pub struct ModuleAssembler<'a> {
    extension: &'a ExtensionMetadata,
    info: &'a JsExpr,
    fragments: &'a Fragments,
}

impl<'a> ModuleAssembler<'a> {
    pub fn new(extension: &'a ExtensionMetadata, info: &'a JsExpr, fragments: &'a Fragments) -> Self {
        Self {
            extension,
            info,
            fragments,
        }
    }

    pub fn assemble(&self) -> String {
        let id = &self.extension.id;
        let mut out = String::new();
        if let Some(header) = self.extension.comment.as_deref().map(header_comment) {
            out.push_str(&header);
            out.push_str("\n\n");
        }
        out.push_str("(function (Scratch) {\n  'use strict';\n\n");
        out.push_str(&self.guard());
        out.push('\n');
        out.push_str(HOST_BINDINGS);
        out.push('\n');
        out.push_str(&self.extension_class());
        out.push('\n');
        out.push_str(&format!(
            "  const PATCHES_ID = {};\n",
            quote(&format!("{}_patches", id))
        ));
        out.push_str(PATCH_INSTALLER);
        out.push('\n');
        out.push_str(&js_generator_patch(self.fragments).render(2));
        out.push('\n');
        out.push_str(&script_tree_patch(self.fragments).render(2));
        out.push('\n');
        out.push_str(&format!("  Scratch.extensions.register(new {}());\n", id));
        out.push_str("})(Scratch);\n");
        out
    }

    fn guard(&self) -> String {
        format!(
            "  if (!Scratch.extensions.unsandboxed) {{\n    throw new Error({});\n  }}\n",
            quote(&format!("{} needs to be run unsandboxed.", self.extension.id))
        )
    }

    fn extension_class(&self) -> String {
        let mut out = format!("  class {} {{\n", self.extension.id);
        out.push_str("    getInfo() {\n");
        out.push_str(&format!("      return {};\n", self.info.render(6)));
        out.push_str("    }\n\n");
        out.push_str(&format!("    {}(args, util, blockJSON) {{\n", DISPATCH_FUNC));
        out.push_str(&format!("      const err = {};\n", quote(ERROR_STUB_MESSAGE)));
        out.push_str(
            "      runtime.visualReport(util.thread.isCompiled ? util.thread.peekStack() : util.thread.peekStackFrame().op.id, err);\n",
        );
        out.push_str("      return err;\n");
        out.push_str("    }\n");
        out.push_str("  }\n");
        out
    }
}

const HOST_BINDINGS: &str = "  const { vm, BlockType, ArgumentType } = Scratch;
  const { runtime } = vm;
  const iwnafhwtb = vm.exports.i_will_not_ask_for_help_when_these_break();
  const { JSGenerator, ScriptTreeGenerator } = iwnafhwtb;
  const {
    TYPE_NUMBER,
    TYPE_STRING,
    TYPE_BOOLEAN,
    TYPE_UNKNOWN,
    TYPE_NUMBER_NAN,
    TypedInput,
    ConstantInput,
    VariableInput,
    Frame,
    sanitize,
  } = JSGenerator.unstable_exports;
  const JSGP = JSGenerator.prototype,
    STGP = ScriptTreeGenerator.prototype;
";

const PATCH_INSTALLER: &str = "  const cst_patch = (obj, functions) => {
    const installed = obj[PATCHES_ID] || (obj[PATCHES_ID] = {});
    for (const name in functions) {
      if (Object.prototype.hasOwnProperty.call(installed, name)) continue;
      const original = obj[name];
      installed[name] = original;
      obj[name] = function (...args) {
        const callOriginal = original ? (...rest) => original.call(this, ...rest) : () => {};
        return functions[name].call(this, callOriginal, ...args);
      };
    }
  };
";

/// Text that already is one block comment, or only line comments, is kept;
/// anything else becomes a block comment.
fn header_comment(comment: &str) -> String {
    let trimmed = comment.trim();
    if is_block_comment(trimmed) || is_line_comments(trimmed) {
        return trimmed.to_string();
    }
    let mut out = String::from("/*\n");
    for line in trimmed.lines() {
        let line = line.replace("*/", "* /");
        if line.is_empty() {
            out.push_str(" *\n");
        } else {
            out.push_str(&format!(" * {}\n", line));
        }
    }
    out.push_str(" */");
    out
}

fn is_block_comment(text: &str) -> bool {
    text.len() >= 4
        && text.starts_with("/*")
        && text[2..].find("*/") == Some(text.len() - 4)
}

fn is_line_comments(text: &str) -> bool {
    text.starts_with("//")
        && text.lines().all(|line| {
            let line = line.trim_start();
            line.is_empty() || line.starts_with("//")
        })
}

pub fn default_output_path(extension: &ExtensionMetadata) -> PathBuf {
    PathBuf::from(format!("{}.js", extension.id))
}

/// Creates parent directories, then replaces `output_path` in one step.
pub fn write_module(text: &str, output_path: &Path) -> Result<()> {
    let parent = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory '{}'.", parent.display()))?;
    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create a temporary file in '{}'.", parent.display()))?;
    temp.write_all(text.as_bytes())?;
    #[cfg(unix)]
    temp.as_file()
        .set_permissions(output_permissions(output_path))
        .with_context(|| format!("Failed to set permissions for '{}'.", output_path.display()))?;
    temp.persist(output_path)
        .with_context(|| format!("Failed to write '{}'.", output_path.display()))?;
    Ok(())
}

/// Keeps the mode of a file being replaced; new files get `0644` instead of the temp file's `0600`.
#[cfg(unix)]
fn output_permissions(output_path: &Path) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(output_path)
        .map(|meta| meta.permissions())
        .unwrap_or_else(|_| fs::Permissions::from_mode(0o644))
}
