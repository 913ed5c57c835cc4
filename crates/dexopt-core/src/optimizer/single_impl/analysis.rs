//! Safety analysis for single-implementation candidates
//!
//! Every check is necessary: a candidate is erased only if its escape set is
//! empty once the whole scope has been scanned. Use sites are collected in the
//! same scan so the rewriter never has to search for them again.

use super::subst::TypeSubstitution;
use super::type_maps::SingleImplMap;
use super::use_sites::UseSite;
use crate::class_hierarchy::ClassHierarchy;
use crate::config::SingleImplConfig;
use crate::ir::{DebugOpcode, DexClass, DexMethod, Instruction, InvokeKind, MethodRef, Scope, TypeOp};
use crate::type_interner::{TypeId, TypeInterner};
use bitflags::bitflags;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

bitflags! {
    /// Reasons a candidate interface cannot be erased
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EscapeReason: u32 {
        /// Implementor is external, outside the scope or itself an interface
        const IMPL_NOT_CONCRETE = 1 << 0;
        /// Excluded by the white/black lists
        const FILTERED = 1 << 1;
        /// Carries a black-listed annotation
        const ANNOTATED = 1 << 2;
        /// Declares fields, default methods, static methods or a class initializer
        const HAS_MEMBERS = 1 << 3;
        /// Operand of const-class or new-instance
        const REFLECTION = 1 << 4;
        /// Mentioned by an external class or a reference into one
        const EXTERNAL_REF = 1 << 5;
        /// Target of a static, super, direct or virtual invoke
        const BAD_INVOKE = 1 << 6;
        /// An interface call would not resolve on the implementor
        const UNRESOLVED_CALL = 1 << 7;
        /// Retyping would merge two distinct member signatures
        const SIG_COLLISION = 1 << 8;
        /// Used as a superclass
        const MALFORMED = 1 << 9;
        /// Extended by an interface that stays
        const HAS_CHILDREN = 1 << 10;
    }
}

/// An interface with one implementor, the verdict on erasing it and the places
/// to patch if it is erased
#[derive(Debug, Clone)]
pub struct SingleImplCandidate {
    pub interface: TypeId,
    pub implementor: TypeId,
    pub escape: EscapeReason,
    pub sites: Vec<UseSite>,
}

impl SingleImplCandidate {
    fn new(interface: TypeId, implementor: TypeId) -> Self {
        Self {
            interface,
            implementor,
            escape: EscapeReason::empty(),
            sites: Vec::new(),
        }
    }

    pub fn is_safe(&self) -> bool {
        self.escape.is_empty()
    }
}

/// Verdicts for every candidate of one cycle, in selection order
#[derive(Debug, Default)]
pub struct SingleImplAnalysis {
    candidates: Vec<SingleImplCandidate>,
}

impl SingleImplAnalysis {
    pub fn analyze(
        scope: &Scope,
        hierarchy: &ClassHierarchy<'_>,
        single_impl: &SingleImplMap,
        interfaces: &FxHashSet<TypeId>,
        config: &SingleImplConfig,
    ) -> Self {
        let mut analyzer = Analyzer::new(hierarchy, single_impl);
        analyzer.check_candidates(interfaces, config);
        analyzer.scan_library();
        for (index, class) in scope.classes().enumerate() {
            analyzer.scan_class(index, class);
        }
        analyzer.reject_collisions();
        analyzer.reject_extended(interfaces);

        let analysis = Self {
            candidates: analyzer.candidates,
        };
        analysis.log_verdicts(hierarchy.types());
        analysis
    }

    pub fn candidates(&self) -> &[SingleImplCandidate] {
        &self.candidates
    }

    pub fn accepted(&self) -> impl Iterator<Item = &SingleImplCandidate> + '_ {
        self.candidates.iter().filter(|c| c.is_safe())
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted().count()
    }

    /// Combined interface -> implementor mapping of every accepted candidate
    pub fn substitution(&self) -> TypeSubstitution {
        let mut subst = TypeSubstitution::new();
        for candidate in self.accepted() {
            subst.insert(candidate.interface, candidate.implementor);
        }
        subst
    }

    fn log_verdicts(&self, types: &TypeInterner) {
        for candidate in &self.candidates {
            if candidate.is_safe() {
                debug!(
                    "single-impl: {} -> {} accepted ({} use sites)",
                    types.resolve(candidate.interface),
                    types.resolve(candidate.implementor),
                    candidate.sites.len()
                );
            } else {
                debug!(
                    "single-impl: {} -> {} rejected: {:?}",
                    types.resolve(candidate.interface),
                    types.resolve(candidate.implementor),
                    candidate.escape
                );
            }
        }
    }
}

struct Analyzer<'h, 'a> {
    hierarchy: &'h ClassHierarchy<'a>,
    types: &'a TypeInterner,
    /// interface -> index into `candidates`
    index: FxHashMap<TypeId, usize>,
    candidates: Vec<SingleImplCandidate>,
}

impl<'h, 'a> Analyzer<'h, 'a> {
    fn new(hierarchy: &'h ClassHierarchy<'a>, single_impl: &SingleImplMap) -> Self {
        let candidates: Vec<_> = single_impl
            .iter()
            .map(|(&intf, &imp)| SingleImplCandidate::new(intf, imp))
            .collect();
        let index = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (c.interface, i))
            .collect();
        Self {
            hierarchy,
            types: hierarchy.types(),
            index,
            candidates,
        }
    }

    fn candidate_of(&self, ty: TypeId) -> Option<usize> {
        self.index.get(&self.types.element_type(ty)).copied()
    }

    fn escape(&mut self, ty: TypeId, reason: EscapeReason) {
        if let Some(i) = self.candidate_of(ty) {
            self.candidates[i].escape |= reason;
        }
    }

    fn site(&mut self, ty: TypeId, site: UseSite) {
        if let Some(i) = self.candidate_of(ty) {
            let sites = &mut self.candidates[i].sites;
            if sites.last() != Some(&site) {
                sites.push(site);
            }
        }
    }

    // =========================================================================
    // Per-candidate checks
    // =========================================================================

    fn check_candidates(&mut self, interfaces: &FxHashSet<TypeId>, config: &SingleImplConfig) {
        let hierarchy = self.hierarchy;
        let types = self.types;

        for candidate in &mut self.candidates {
            let imp = candidate.implementor;
            if !hierarchy.is_internal(imp) || interfaces.contains(&imp) {
                candidate.escape |= EscapeReason::IMPL_NOT_CONCRETE;
            }

            if !config.allows(types.resolve(candidate.interface)) {
                candidate.escape |= EscapeReason::FILTERED;
            }

            let Some(intf_cls) = hierarchy.type_class(candidate.interface) else {
                candidate.escape |= EscapeReason::IMPL_NOT_CONCRETE;
                continue;
            };
            let pinned = intf_cls.annotations.iter().any(|&anno| {
                config
                    .anno_black_list
                    .iter()
                    .any(|name| name == types.resolve(anno))
            });
            if pinned {
                candidate.escape |= EscapeReason::ANNOTATED;
            }
            if !intf_cls.fields.is_empty() || intf_cls.methods.iter().any(|m| m.code.is_some()) {
                candidate.escape |= EscapeReason::HAS_MEMBERS;
            }
        }
    }

    // =========================================================================
    // Scope scan
    // =========================================================================

    fn scan_library(&mut self) {
        let hierarchy = self.hierarchy;
        for class in hierarchy.library() {
            for ty in class.signature_types() {
                self.escape(ty, EscapeReason::EXTERNAL_REF);
            }
        }
    }

    fn scan_class(&mut self, class_index: usize, class: &DexClass) {
        if class.is_external() {
            let code = class.methods.iter().filter_map(|m| m.code.as_ref());
            let code_types: Vec<TypeId> = code
                .flat_map(|c| {
                    c.insns
                        .iter()
                        .flat_map(Instruction::referenced_types)
                        .chain(c.catches.iter().copied())
                })
                .collect();
            for ty in class.signature_types().chain(code_types) {
                self.escape(ty, EscapeReason::EXTERNAL_REF);
            }
            return;
        }

        if let Some(super_class) = class.super_class {
            self.escape(super_class, EscapeReason::MALFORMED);
        }

        for (field_index, field) in class.fields.iter().enumerate() {
            self.site(
                field.ty,
                UseSite::FieldType {
                    class: class_index,
                    field: field_index,
                },
            );
        }

        for (method_index, method) in class.methods.iter().enumerate() {
            for ty in method.proto.types() {
                self.site(
                    ty,
                    UseSite::MethodProto {
                        class: class_index,
                        method: method_index,
                    },
                );
            }
            self.scan_code(class_index, method_index, method);
        }
    }

    fn scan_code(&mut self, class: usize, method: usize, body: &DexMethod) {
        let Some(code) = &body.code else {
            return;
        };

        for (insn, instruction) in code.insns.iter().enumerate() {
            match instruction {
                Instruction::Invoke { kind, method: target } => {
                    self.scan_invoke(*kind, target, UseLocation { class, method, insn });
                }
                Instruction::Field { field, .. } => {
                    let site = UseSite::MemberRef { class, method, insn };
                    if self.candidate_of(field.owner).is_some() {
                        self.escape(field.owner, EscapeReason::HAS_MEMBERS);
                    } else if !self.hierarchy.is_internal(self.types.element_type(field.owner)) {
                        self.escape(field.ty, EscapeReason::EXTERNAL_REF);
                    } else {
                        self.site(field.ty, site);
                    }
                }
                Instruction::Type { op, ty } => match op {
                    TypeOp::ConstClass | TypeOp::NewInstance => {
                        self.escape(*ty, EscapeReason::REFLECTION);
                    }
                    TypeOp::CheckCast
                    | TypeOp::InstanceOf
                    | TypeOp::NewArray
                    | TypeOp::FilledNewArray => {
                        self.site(*ty, UseSite::TypeOperand { class, method, insn });
                    }
                },
                Instruction::Other(_) => {}
            }
        }

        for (catch, &ty) in code.catches.iter().enumerate() {
            self.site(ty, UseSite::CatchType { class, method, catch });
        }

        if let Some(debug) = &code.debug {
            for (opcode, op) in debug.opcodes.iter().enumerate() {
                if let DebugOpcode::StartLocal { ty, .. } = op {
                    self.site(*ty, UseSite::DebugLocal { class, method, opcode });
                }
            }
        }
    }

    fn scan_invoke(&mut self, kind: InvokeKind, target: &MethodRef, at: UseLocation) {
        let UseLocation { class, method, insn } = at;

        if let Some(i) = self.candidate_of(target.owner) {
            if kind == InvokeKind::Interface && !self.types.is_array(target.owner) {
                self.site(target.owner, UseSite::InvokeInterface { class, method, insn });
                if !self.resolves_on_implementor(i, target) {
                    self.candidates[i].escape |= EscapeReason::UNRESOLVED_CALL;
                }
            } else {
                self.candidates[i].escape |= EscapeReason::BAD_INVOKE;
            }
        } else if !self.hierarchy.is_internal(self.types.element_type(target.owner)) {
            for ty in target.proto.types() {
                self.escape(ty, EscapeReason::EXTERNAL_REF);
            }
            return;
        }

        for ty in target.proto.types() {
            self.site(ty, UseSite::MemberRef { class, method, insn });
        }
    }

    /// Whether `target`, retyped onto the implementor, finds a non-static
    /// method of the same name and prototype on the implementor's superclass
    /// chain
    fn resolves_on_implementor(&self, candidate: usize, target: &MethodRef) -> bool {
        let candidate = &self.candidates[candidate];
        let mut subst = TypeSubstitution::new();
        subst.insert(candidate.interface, candidate.implementor);
        let wanted = subst.proto_key(self.types, &target.proto);

        self.hierarchy
            .resolve_virtual(candidate.implementor, |m| {
                m.is_virtual() && m.name == target.name && subst.proto_key(self.types, &m.proto) == wanted
            })
            .is_some()
    }

    // =========================================================================
    // Signature collisions
    // =========================================================================

    /// Accept candidates one at a time, rejecting any whose erasure, together
    /// with those already accepted, would merge two member signatures
    fn reject_collisions(&mut self) {
        let mut accepted = TypeSubstitution::new();
        for i in 0..self.candidates.len() {
            if !self.candidates[i].is_safe() {
                continue;
            }
            let mut trial = accepted.clone();
            trial.insert(self.candidates[i].interface, self.candidates[i].implementor);
            if self.has_collision(&trial) {
                self.candidates[i].escape |= EscapeReason::SIG_COLLISION;
            } else {
                accepted = trial;
            }
        }
    }

    // =========================================================================
    // Surviving sub-interfaces
    // =========================================================================

    /// Reject every candidate directly extended by an interface that is not
    /// erased along with it.
    ///
    /// A kept `J extends I` can flow into slots typed `I`; once those are
    /// retyped to the implementor, `J` is no longer assignable to them.
    /// Rejecting `I` can in turn keep `I`'s own super-interfaces, so this
    /// runs until nothing changes. Dropping candidates never introduces a
    /// signature collision, so the earlier collision verdicts still hold.
    fn reject_extended(&mut self, interfaces: &FxHashSet<TypeId>) {
        let hierarchy = self.hierarchy;
        loop {
            let mut changed = false;
            for &intf in interfaces {
                let erased = self.candidate_of(intf).is_some_and(|i| self.candidates[i].is_safe());
                if erased {
                    continue;
                }
                let Some(intf_cls) = hierarchy.type_class(intf) else {
                    continue;
                };
                for &parent in &intf_cls.interfaces {
                    let Some(i) = self.index.get(&parent).copied() else {
                        continue;
                    };
                    if self.candidates[i].is_safe() {
                        self.candidates[i].escape |= EscapeReason::HAS_CHILDREN;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn has_collision(&self, subst: &TypeSubstitution) -> bool {
        let types = self.types;
        self.hierarchy
            .scope()
            .classes()
            .filter(|class| !class.is_external())
            .any(|class| {
                let methods = class
                    .methods
                    .iter()
                    .filter(|m| subst.proto_mentions(types, &m.proto))
                    .any(|m| self.method_collides(class.ty, m, subst));
                methods
                    || class
                        .fields
                        .iter()
                        .filter(|f| subst.mentions(types, f.ty))
                        .any(|f| self.field_collides(class.ty, &f.name, f.ty, subst))
            })
    }

    /// The class itself, its supertypes and its subtypes
    fn related(&self, ty: TypeId) -> Vec<&'a DexClass> {
        let hierarchy = self.hierarchy;
        std::iter::once(ty)
            .chain(hierarchy.ancestors(ty))
            .chain(hierarchy.descendants(ty))
            .filter_map(|t| hierarchy.type_class(t))
            .collect()
    }

    fn method_collides(&self, owner: TypeId, method: &DexMethod, subst: &TypeSubstitution) -> bool {
        let key = subst.proto_key(self.types, &method.proto);
        self.related(owner).into_iter().any(|class| {
            class.methods.iter().any(|other| {
                other.name == method.name
                    && other.proto != method.proto
                    && subst.proto_key(self.types, &other.proto) == key
            })
        })
    }

    fn field_collides(&self, owner: TypeId, name: &str, ty: TypeId, subst: &TypeSubstitution) -> bool {
        let key = subst.type_key(self.types, ty);
        self.related(owner).into_iter().any(|class| {
            class
                .fields
                .iter()
                .any(|other| other.name == name && other.ty != ty && subst.type_key(self.types, other.ty) == key)
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct UseLocation {
    class: usize,
    method: usize,
    insn: usize,
}
