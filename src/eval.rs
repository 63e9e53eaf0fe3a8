use crate::{
    namespace::{AmlName, NameSeg, MAX_RESOLUTION_DEPTH},
    object::{FieldFlags, FieldUnit, FieldUnitKind, FieldUpdateRule, MethodFlags, Object, ReferenceKind, copy_bits},
    op_region::{OpRegion, RegionSpace},
    opcode::*,
    parser::MethodContext,
    stack::StackFrame,
    AmlError, Handler, Interpreter,
};
use alloc::{vec, vec::Vec};
use log::{debug, trace};

/// How control leaves a term: normally, or early via `Return`, `Break`, or `Continue`.
/// Non-normal flow propagates out of enclosing blocks until a loop or the invocation
/// itself absorbs it.
#[derive(Clone, PartialEq, Debug)]
pub(crate) enum Flow {
    Normal,
    Return(Object),
    Break,
    Continue,
}

/// A resolved store destination.
#[derive(Clone, Debug)]
enum Target {
    Null,
    Local(u8),
    Arg(u8),
    Name(AmlName),
    Element { container: AmlName, index: u64 },
    Debug,
}

impl<H> Interpreter<H>
where
    H: Handler,
{
    /// Execute a table's top-level term list, populating the namespace. Names defined
    /// here are permanent. `stream` is the encoded AML after the table header.
    pub fn load_table(&mut self, stream: &[u8]) -> Result<(), AmlError> {
        let mut context = MethodContext::new(stream, AmlName::root());
        let end = context.len();
        self.stack.push(StackFrame::new());
        let result = self.execute_block(&mut context, end);
        self.stack.pop();
        result.map(|_| ())
    }

    /// Invoke the object at `path`. Methods run with the given arguments; any other
    /// object evaluates to its value, and passing arguments to one is an error.
    pub fn invoke(&mut self, path: &AmlName, args: Vec<Object>) -> Result<Object, AmlError> {
        let (name, id) = self.namespace.search(path, &AmlName::root())?;
        match self.namespace.object(id)?.clone() {
            Object::Method { flags, code } => self.invoke_method(&name, flags, &code, args),
            _ if args.is_empty() => self.value_of_name(&name, &AmlName::root(), 0),
            object => Err(AmlError::UnsupportedObjectKind(object.type_of())),
        }
    }

    /// Convenience wrapper over [`Interpreter::invoke`] taking a textual path.
    pub fn invoke_by_name(&mut self, path: &str, args: Vec<Object>) -> Result<Object, AmlError> {
        use core::str::FromStr;
        self.invoke(&AmlName::from_str(path)?, args)
    }

    /// Evaluate the object at `path` to a plain value: methods are invoked with no
    /// arguments, fields and buffer fields are read, and names held as data are chased
    /// until they reach a value.
    pub fn eval_simple(&mut self, path: &AmlName) -> Result<Object, AmlError> {
        self.value_of_name(path, &AmlName::root(), 0)
    }

    fn invoke_method(
        &mut self,
        name: &AmlName,
        flags: MethodFlags,
        code: &[u8],
        args: Vec<Object>,
    ) -> Result<Object, AmlError> {
        if args.len() != flags.arg_count() {
            return Err(AmlError::MethodArgCountIncorrect);
        }
        trace!("Invoking {} with {} args", name, args.len());

        self.stack.push(StackFrame::with_args(args)?);
        self.namespace.begin_group();
        let mut context = MethodContext::new(code, name.clone());
        let end = context.len();
        let result = self.execute_block(&mut context, end);
        self.namespace.end_group();
        self.stack.pop();

        match result? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Object::Uninitialized),
        }
    }

    fn execute_block(&mut self, context: &mut MethodContext, end: usize) -> Result<Flow, AmlError> {
        while context.pc < end {
            match self.execute_term(context, end)? {
                Flow::Normal => (),
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_term(&mut self, context: &mut MethodContext, block_end: usize) -> Result<Flow, AmlError> {
        let scope = context.scope.clone();
        let op = context.opcode()?;
        match op {
            op if op == NAME_OP as u16 => {
                let name = context.namestring()?.resolve(&scope)?;
                let value = self.expression(context)?;
                self.namespace.insert(&name, value)?;
            }
            op if op == ALIAS_OP as u16 => {
                let source = context.namestring()?;
                let (source, _) = self.namespace.search(&source, &scope)?;
                let name = context.namestring()?.resolve(&scope)?;
                self.namespace.insert(&name, Object::Reference { kind: ReferenceKind::Alias(source) })?;
            }
            op if op == SCOPE_OP as u16 => {
                let end = context.pkglength_end()?;
                let name = context.namestring()?.resolve(&scope)?;
                self.namespace.create_path(&name)?;
                context.scope = name;
                let flow = self.execute_block(context, end);
                context.scope = scope;
                return flow;
            }
            op if op == METHOD_OP as u16 => {
                let end = context.pkglength_end()?;
                let name = context.namestring()?.resolve(&scope)?;
                let flags = MethodFlags(context.next()?);
                let code = context.slice(context.pc, end)?.to_vec();
                context.pc = end;
                self.namespace.insert(&name, Object::Method { flags, code })?;
            }
            EXT_OP_REGION_OP => {
                let name = context.namestring()?.resolve(&scope)?;
                let space = RegionSpace::from_byte(context.next()?);
                let base = self.expression(context)?.as_integer()?;
                let length = self.expression(context)?.as_integer()?;
                self.namespace.insert(&name, Object::OpRegion(OpRegion { space, base, length }))?;
            }
            EXT_FIELD_OP => {
                let end = context.pkglength_end()?;
                let region = context.namestring()?;
                let (region, _) = self.namespace.search(&region, &scope)?;
                self.field_list(context, end, FieldUnitKind::Normal { region })?;
            }
            EXT_INDEX_FIELD_OP => {
                let end = context.pkglength_end()?;
                let index = context.namestring()?;
                let (index, _) = self.namespace.search(&index, &scope)?;
                let data = context.namestring()?;
                let (data, _) = self.namespace.search(&data, &scope)?;
                self.field_list(context, end, FieldUnitKind::Index { index, data })?;
            }
            EXT_DEVICE_OP => {
                let end = context.pkglength_end()?;
                let name = context.namestring()?.resolve(&scope)?;
                self.namespace.create_path(&name)?;
                context.scope = name;
                let flow = self.execute_block(context, end);
                context.scope = scope;
                return flow;
            }
            op if op == STORE_OP as u16 => {
                let value = self.expression(context)?;
                let target = self.target(context)?;
                self.store(&target, value, &scope)?;
            }
            op if matches!(
                op as u8,
                CREATE_BIT_FIELD_OP
                    | CREATE_BYTE_FIELD_OP
                    | CREATE_WORD_FIELD_OP
                    | CREATE_DWORD_FIELD_OP
                    | CREATE_QWORD_FIELD_OP
            ) && op <= 0xff =>
            {
                self.create_buffer_field(op as u8, context)?;
            }
            op if op == IF_OP as u16 => return self.execute_if(context, block_end),
            op if op == WHILE_OP as u16 => return self.execute_while(context),
            op if op == RETURN_OP as u16 => {
                let value = self.expression(context)?;
                return Ok(Flow::Return(value));
            }
            op if op == BREAK_OP as u16 => return Ok(Flow::Break),
            op if op == CONTINUE_OP as u16 => return Ok(Flow::Continue),
            op if op == NOOP_OP as u16 => (),
            op if op == BREAKPOINT_OP as u16 => {
                debug!("Breakpoint reached at pc {:#x}", context.pc);
            }
            op if op == INCREMENT_OP as u16 || op == DECREMENT_OP as u16 => {
                let target = self.target(context)?;
                let value = self.target_value(&target, &scope)?.as_integer()?;
                let value = if op == INCREMENT_OP as u16 { value.wrapping_add(1) } else { value.wrapping_sub(1) };
                self.store(&target, Object::Integer(value), &scope)?;
            }
            op => {
                // Anything else is an expression in statement position; evaluate it for
                // its side effects and drop the result.
                let _ = self.expression_inner(op, context)?;
            }
        }
        Ok(Flow::Normal)
    }

    /// `block_end` bounds the block the If itself appears in; an Else is only part of
    /// this If when it starts before that boundary.
    fn execute_if(&mut self, context: &mut MethodContext, block_end: usize) -> Result<Flow, AmlError> {
        let then_end = context.pkglength_end()?;
        let predicate = self.expression(context)?.as_integer()?;

        if predicate != 0 {
            let flow = self.execute_block(context, then_end)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
            if context.pc < block_end && context.peek()? == ELSE_OP {
                context.next()?;
                let else_end = context.pkglength_end()?;
                context.pc = else_end;
            }
            Ok(Flow::Normal)
        } else {
            context.pc = then_end;
            if context.pc < block_end && context.peek()? == ELSE_OP {
                context.next()?;
                let else_end = context.pkglength_end()?;
                let flow = self.execute_block(context, else_end)?;
                if flow != Flow::Normal {
                    return Ok(flow);
                }
                context.pc = else_end;
            }
            Ok(Flow::Normal)
        }
    }

    fn execute_while(&mut self, context: &mut MethodContext) -> Result<Flow, AmlError> {
        let end = context.pkglength_end()?;
        let predicate_pc = context.pc;

        loop {
            context.pc = predicate_pc;
            let predicate = self.expression(context)?.as_integer()?;
            if predicate == 0 {
                break;
            }

            match self.execute_block(context, end)? {
                Flow::Normal | Flow::Continue => (),
                Flow::Break => break,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }

        context.pc = end;
        Ok(Flow::Normal)
    }

    fn expression(&mut self, context: &mut MethodContext) -> Result<Object, AmlError> {
        let op = context.opcode()?;
        self.expression_inner(op, context)
    }

    fn expression_inner(&mut self, op: u16, context: &mut MethodContext) -> Result<Object, AmlError> {
        let scope = context.scope.clone();
        let value = match op {
            op if op == ZERO_OP as u16 => Object::Integer(0),
            op if op == ONE_OP as u16 => Object::Integer(1),
            op if op == ONES_OP as u16 => Object::Integer(u64::MAX),
            op if op == BYTE_PREFIX as u16 => Object::Integer(context.next()? as u64),
            op if op == WORD_PREFIX as u16 => Object::Integer(context.next_u16()? as u64),
            op if op == DWORD_PREFIX as u16 => Object::Integer(context.next_u32()? as u64),
            op if op == QWORD_PREFIX as u16 => Object::Integer(context.next_u64()?),
            op if op == STRING_PREFIX as u16 => Object::String(context.ascii_string()?),
            op if op == BUFFER_OP as u16 => self.parse_buffer(context)?,
            op if op == PACKAGE_OP as u16 => self.parse_package(context)?,
            op if (LOCAL0_OP..LOCAL0_OP + 8).contains(&(op as u8)) && op <= 0xff => {
                self.stack.current()?.local(op as u8 - LOCAL0_OP)?.clone()
            }
            op if (ARG0_OP..ARG0_OP + 7).contains(&(op as u8)) && op <= 0xff => {
                self.stack.current()?.arg(op as u8 - ARG0_OP)?.clone()
            }
            op if matches!(
                op as u8,
                ADD_OP | SUBTRACT_OP | MULTIPLY_OP | SHIFT_LEFT_OP | SHIFT_RIGHT_OP | AND_OP | OR_OP | XOR_OP
            ) && op <= 0xff =>
            {
                let left = self.expression(context)?.as_integer()?;
                let right = self.expression(context)?.as_integer()?;
                let target = self.target(context)?;
                let value = match op as u8 {
                    ADD_OP => left.wrapping_add(right),
                    SUBTRACT_OP => left.wrapping_sub(right),
                    MULTIPLY_OP => left.wrapping_mul(right),
                    SHIFT_LEFT_OP => {
                        if right >= 64 {
                            0
                        } else {
                            left.wrapping_shl(right as u32)
                        }
                    }
                    SHIFT_RIGHT_OP => {
                        if right >= 64 {
                            0
                        } else {
                            left.wrapping_shr(right as u32)
                        }
                    }
                    AND_OP => left & right,
                    OR_OP => left | right,
                    XOR_OP => left ^ right,
                    _ => unreachable!(),
                };
                let value = Object::Integer(value);
                self.store(&target, value.clone(), &scope)?;
                value
            }
            op if op == NOT_OP as u16 => {
                let operand = self.expression(context)?.as_integer()?;
                let target = self.target(context)?;
                let value = Object::Integer(!operand);
                self.store(&target, value.clone(), &scope)?;
                value
            }
            op if op == TO_INTEGER_OP as u16 => {
                let operand = self.expression(context)?;
                let target = self.target(context)?;
                let value = Object::Integer(operand.as_integer()?);
                self.store(&target, value.clone(), &scope)?;
                value
            }
            op if op == TO_BUFFER_OP as u16 => {
                let operand = self.expression(context)?;
                let target = self.target(context)?;
                let value = match operand {
                    Object::Buffer(bytes) => Object::Buffer(bytes),
                    Object::Integer(operand) => Object::Buffer(operand.to_le_bytes().to_vec()),
                    Object::String(string) => {
                        let mut bytes = string.as_bytes().to_vec();
                        bytes.push(0);
                        Object::Buffer(bytes)
                    }
                    other => return Err(AmlError::UnsupportedObjectKind(other.type_of())),
                };
                self.store(&target, value.clone(), &scope)?;
                value
            }
            op if matches!(op as u8, L_EQUAL_OP | L_LESS_OP | L_GREATER_OP | L_AND_OP | L_OR_OP) && op <= 0xff => {
                let left = self.expression(context)?.as_integer()?;
                let right = self.expression(context)?.as_integer()?;
                let result = match op as u8 {
                    L_EQUAL_OP => left == right,
                    L_LESS_OP => left < right,
                    L_GREATER_OP => left > right,
                    L_AND_OP => left != 0 && right != 0,
                    L_OR_OP => left != 0 || right != 0,
                    _ => unreachable!(),
                };
                Object::Integer(if result { u64::MAX } else { 0 })
            }
            op if op == L_NOT_OP as u16 => {
                let operand = self.expression(context)?.as_integer()?;
                Object::Integer(if operand == 0 { u64::MAX } else { 0 })
            }
            op if op == DEREF_OF_OP as u16 => {
                let operand = self.expression(context)?;
                self.deref(operand, &scope, 0)?
            }
            op if op == INDEX_OP as u16 => {
                let source = self.index_source(context)?;
                let index = self.expression(context)?.as_integer()?;
                let target = self.target(context)?;
                let reference = Object::Reference { kind: ReferenceKind::Element { target: source, index } };
                self.store(&target, reference.clone(), &scope)?;
                reference
            }
            op if op == SIZE_OF_OP as u16 => {
                let target = self.target(context)?;
                let value = self.target_value(&target, &scope)?;
                match value {
                    Object::Buffer(bytes) => Object::Integer(bytes.len() as u64),
                    Object::String(string) => Object::Integer(string.len() as u64),
                    Object::Package(elements) => Object::Integer(elements.len() as u64),
                    other => return Err(AmlError::UnsupportedObjectKind(other.type_of())),
                }
            }
            op if op == REF_OF_OP as u16 => {
                let name = context.namestring()?;
                let (name, _) = self.namespace.search(&name, &scope)?;
                Object::Reference { kind: ReferenceKind::Alias(name) }
            }
            EXT_DEBUG_OP => Object::Debug,
            op if is_name_lead(op) => {
                context.pc -= 1;
                let name = context.namestring()?;
                let (name, id) = self.namespace.search(&name, &scope)?;
                match self.namespace.object(id)?.clone() {
                    Object::Method { flags, code } => {
                        let mut args = Vec::with_capacity(flags.arg_count());
                        for _ in 0..flags.arg_count() {
                            args.push(self.expression(context)?);
                        }
                        self.invoke_method(&name, flags, &code, args)?
                    }
                    _ => self.value_of_name(&name, &scope, 0)?,
                }
            }
            op => return Err(AmlError::IllegalOpcode(op)),
        };
        Ok(value)
    }

    fn parse_buffer(&mut self, context: &mut MethodContext) -> Result<Object, AmlError> {
        let end = context.pkglength_end()?;
        let size = self.expression(context)?.as_integer()? as usize;
        let mut bytes = context.slice(context.pc, end)?.to_vec();
        context.pc = end;
        bytes.resize(size, 0);
        Ok(Object::Buffer(bytes))
    }

    fn parse_package(&mut self, context: &mut MethodContext) -> Result<Object, AmlError> {
        let end = context.pkglength_end()?;
        let count = context.next()? as usize;

        let mut elements = Vec::with_capacity(count);
        while context.pc < end {
            // A bare name in a package is data, not an invocation
            if is_name_lead(context.peek()? as u16) {
                elements.push(Object::NameString(context.namestring()?));
            } else {
                let element = self.expression(context)?;
                elements.push(element);
            }
        }
        context.pc = end;

        elements.resize(count, Object::Uninitialized);
        Ok(Object::Package(elements))
    }

    fn create_buffer_field(&mut self, op: u8, context: &mut MethodContext) -> Result<(), AmlError> {
        let scope = context.scope.clone();
        let source = context.namestring()?;
        let (buffer, _) = self.namespace.search(&source, &scope)?;
        let index = self.expression(context)?.as_integer()? as usize;
        let name = context.namestring()?.resolve(&scope)?;

        let (offset_bits, length_bits) = match op {
            CREATE_BIT_FIELD_OP => (index, 1),
            CREATE_BYTE_FIELD_OP => (index * 8, 8),
            CREATE_WORD_FIELD_OP => (index * 8, 16),
            CREATE_DWORD_FIELD_OP => (index * 8, 32),
            CREATE_QWORD_FIELD_OP => (index * 8, 64),
            _ => unreachable!(),
        };

        self.namespace.insert(&name, Object::BufferField { buffer, offset_bits, length_bits })?;
        Ok(())
    }

    /// Parse a FieldList, creating one field unit per named element. The same parse
    /// covers normal and index fields, which differ only in `kind`.
    fn field_list(
        &mut self,
        context: &mut MethodContext,
        end: usize,
        kind: FieldUnitKind,
    ) -> Result<(), AmlError> {
        let scope = context.scope.clone();
        let mut flags = FieldFlags(context.next()?);
        let mut bit_index = 0;

        while context.pc < end {
            match context.peek()? {
                0x00 => {
                    // Reserved element: a gap of bits
                    context.next()?;
                    bit_index += context.pkglength()?;
                }
                0x01 => {
                    // AccessField: changes the access type mid-list
                    context.next()?;
                    let access_type = context.next()?;
                    let _access_attrib = context.next()?;
                    flags = FieldFlags((flags.0 & 0xf0) | (access_type & 0x0f));
                }
                _ => {
                    let seg = NameSeg::from_bytes([
                        context.next()?,
                        context.next()?,
                        context.next()?,
                        context.next()?,
                    ])?;
                    let bit_length = context.pkglength()?;
                    let name = AmlName::from_name_seg(seg).resolve(&scope)?;
                    self.namespace.insert(
                        &name,
                        Object::FieldUnit(FieldUnit { kind: kind.clone(), flags, bit_index, bit_length }),
                    )?;
                    bit_index += bit_length;
                }
            }
        }
        context.pc = end;
        Ok(())
    }

    /// The source of an `Index` expression must be nameable, so the resulting reference
    /// can find its container again later.
    fn index_source(&mut self, context: &mut MethodContext) -> Result<AmlName, AmlError> {
        let scope = context.scope.clone();
        let op = context.opcode()?;
        match op {
            op if is_name_lead(op) => {
                context.pc -= 1;
                let name = context.namestring()?;
                let (name, _) = self.namespace.search(&name, &scope)?;
                Ok(name)
            }
            op if (LOCAL0_OP..LOCAL0_OP + 8).contains(&(op as u8)) && op <= 0xff => {
                let value = self.stack.current()?.local(op as u8 - LOCAL0_OP)?.clone();
                self.name_of_value(value)
            }
            op if (ARG0_OP..ARG0_OP + 7).contains(&(op as u8)) && op <= 0xff => {
                let value = self.stack.current()?.arg(op as u8 - ARG0_OP)?.clone();
                self.name_of_value(value)
            }
            _ => Err(AmlError::IllegalOpcode(op)),
        }
    }

    fn name_of_value(&mut self, value: Object) -> Result<AmlName, AmlError> {
        match value {
            Object::NameString(name) | Object::Reference { kind: ReferenceKind::Alias(name) } => {
                let (name, _) = self.namespace.search(&name, &AmlName::root())?;
                Ok(name)
            }
            other => Err(AmlError::UnsupportedObjectKind(other.type_of())),
        }
    }

    fn target(&mut self, context: &mut MethodContext) -> Result<Target, AmlError> {
        match context.peek()? {
            NULL_NAME => {
                context.next()?;
                Ok(Target::Null)
            }
            byte if (LOCAL0_OP..LOCAL0_OP + 8).contains(&byte) => {
                context.next()?;
                Ok(Target::Local(byte - LOCAL0_OP))
            }
            byte if (ARG0_OP..ARG0_OP + 7).contains(&byte) => {
                context.next()?;
                Ok(Target::Arg(byte - ARG0_OP))
            }
            INDEX_OP => {
                // An Index expression is a valid store destination
                context.next()?;
                let container = self.index_source(context)?;
                let index = self.expression(context)?.as_integer()?;
                let inner = self.target(context)?;
                let scope = context.scope.clone();
                let reference = Object::Reference { kind: ReferenceKind::Element { target: container.clone(), index } };
                self.store(&inner, reference, &scope)?;
                Ok(Target::Element { container, index })
            }
            EXT_PREFIX => {
                let op = context.opcode()?;
                if op == EXT_DEBUG_OP {
                    Ok(Target::Debug)
                } else {
                    Err(AmlError::IllegalOpcode(op))
                }
            }
            _ => Ok(Target::Name(context.namestring()?)),
        }
    }

    fn target_value(&mut self, target: &Target, scope: &AmlName) -> Result<Object, AmlError> {
        match target {
            Target::Local(index) => Ok(self.stack.current()?.local(*index)?.clone()),
            Target::Arg(index) => Ok(self.stack.current()?.arg(*index)?.clone()),
            Target::Name(name) => self.value_of_name(name, scope, 0),
            Target::Element { container, index } => self.deref_element(container, *index, 0),
            Target::Null | Target::Debug => Err(AmlError::InvalidStoreTarget),
        }
    }

    fn store(&mut self, target: &Target, value: Object, scope: &AmlName) -> Result<(), AmlError> {
        match target {
            Target::Null => Ok(()),
            Target::Debug => {
                debug!("Debug store: {}", value);
                Ok(())
            }
            Target::Local(index) => {
                *self.stack.current_mut()?.local_mut(*index)? = value;
                Ok(())
            }
            Target::Arg(index) => {
                // Storing to an argument that holds a reference writes through it;
                // anything else just replaces the slot.
                let current = self.stack.current()?.arg(*index)?.clone();
                match current {
                    Object::Reference { kind: ReferenceKind::Alias(name) } => {
                        self.store_to_name(&name, &AmlName::root(), value, 0)
                    }
                    Object::Reference { kind: ReferenceKind::Element { target, index } } => {
                        self.store_to_element(&target, index, value)
                    }
                    _ => {
                        *self.stack.current_mut()?.arg_mut(*index)? = value;
                        Ok(())
                    }
                }
            }
            Target::Name(name) => self.store_to_name(name, scope, value, 0),
            Target::Element { container, index } => self.store_to_element(container, *index, value),
        }
    }

    /// Store a value through a named object, dispatching on that object's kind. Names
    /// held as data are chased with a bounded depth, like on the read side.
    fn store_to_name(
        &mut self,
        path: &AmlName,
        scope: &AmlName,
        value: Object,
        depth: usize,
    ) -> Result<(), AmlError> {
        if depth > MAX_RESOLUTION_DEPTH {
            return Err(AmlError::ResolutionDidNotConverge);
        }

        let (name, id) = self.namespace.search(path, scope)?;
        match self.namespace.object(id)?.clone() {
            Object::NameString(next) => self.store_to_name(&next, &name.parent()?, value, depth + 1),
            Object::Reference { kind: ReferenceKind::Alias(next) } => {
                self.store_to_name(&next, &AmlName::root(), value, depth + 1)
            }
            Object::Reference { kind: ReferenceKind::Element { target, index } } => {
                self.store_to_element(&target, index, value)
            }
            Object::FieldUnit(field) => self.write_field(&field, value.as_integer()?),
            Object::BufferField { buffer, offset_bits, length_bits } => {
                self.write_buffer_field(&buffer, offset_bits, length_bits, value.as_integer()?)
            }
            Object::Method { .. } => Err(AmlError::InvalidStoreTarget),
            _ => {
                *self.namespace.object_mut(id)? = value;
                Ok(())
            }
        }
    }

    fn store_to_element(&mut self, container: &AmlName, index: u64, value: Object) -> Result<(), AmlError> {
        let id = self.namespace.id_for_path(container)?;
        match self.namespace.object_mut(id)? {
            Object::Package(elements) => {
                let slot = elements.get_mut(index as usize).ok_or(AmlError::InvalidStoreTarget)?;
                *slot = value;
                Ok(())
            }
            Object::Buffer(bytes) => {
                let byte = value.as_integer()? as u8;
                let slot = bytes.get_mut(index as usize).ok_or(AmlError::InvalidStoreTarget)?;
                *slot = byte;
                Ok(())
            }
            other => Err(AmlError::UnsupportedObjectKind(other.type_of())),
        }
    }

    /// Evaluate the object at `path` to a value. A chain of names held as data converges
    /// within `MAX_RESOLUTION_DEPTH` steps or the evaluation fails.
    fn value_of_name(&mut self, path: &AmlName, scope: &AmlName, depth: usize) -> Result<Object, AmlError> {
        if depth > MAX_RESOLUTION_DEPTH {
            return Err(AmlError::ResolutionDidNotConverge);
        }

        let (name, id) = self.namespace.search(path, scope)?;
        match self.namespace.object(id)?.clone() {
            Object::NameString(next) => self.value_of_name(&next, &name.parent()?, depth + 1),
            Object::Reference { kind: ReferenceKind::Alias(next) } => {
                self.value_of_name(&next, &AmlName::root(), depth + 1)
            }
            Object::Reference { kind: ReferenceKind::Element { target, index } } => {
                self.deref_element(&target, index, depth)
            }
            Object::Method { flags, code } => {
                if flags.arg_count() != 0 {
                    return Err(AmlError::MethodArgCountIncorrect);
                }
                self.invoke_method(&name, flags, &code, vec![])
            }
            Object::FieldUnit(field) => self.read_field(&field),
            Object::BufferField { buffer, offset_bits, length_bits } => {
                self.read_buffer_field(&buffer, offset_bits, length_bits)
            }
            object => Ok(object),
        }
    }

    fn deref(&mut self, object: Object, scope: &AmlName, depth: usize) -> Result<Object, AmlError> {
        match object {
            Object::Reference { kind: ReferenceKind::Element { target, index } } => {
                self.deref_element(&target, index, depth)
            }
            Object::Reference { kind: ReferenceKind::Alias(name) } => {
                self.value_of_name(&name, &AmlName::root(), depth)
            }
            Object::NameString(name) => self.value_of_name(&name, scope, depth),
            other => Err(AmlError::UnsupportedObjectKind(other.type_of())),
        }
    }

    /// Dereference an element reference. Indexing past the end of the container is not an
    /// error; it reads as `Integer(0)`.
    fn deref_element(&mut self, container: &AmlName, index: u64, depth: usize) -> Result<Object, AmlError> {
        let value = self.value_of_name(container, &AmlName::root(), depth)?;
        match value {
            Object::Package(elements) => {
                Ok(elements.get(index as usize).cloned().unwrap_or(Object::Integer(0)))
            }
            Object::Buffer(bytes) => {
                Ok(Object::Integer(bytes.get(index as usize).copied().unwrap_or(0) as u64))
            }
            Object::String(string) => {
                Ok(Object::Integer(string.as_bytes().get(index as usize).copied().unwrap_or(0) as u64))
            }
            other => Err(AmlError::UnsupportedObjectKind(other.type_of())),
        }
    }

    fn read_field(&mut self, field: &FieldUnit) -> Result<Object, AmlError> {
        match &field.kind {
            FieldUnitKind::Normal { region } => {
                let region = self.op_region_of(region)?;
                region.read_field(field.flags, field.bit_index, field.bit_length, &mut self.handler)
            }
            FieldUnitKind::Index { index, data } => {
                let (index, data) = (index.clone(), data.clone());
                self.store_to_name(&index, &AmlName::root(), Object::Integer((field.bit_index / 8) as u64), 0)?;
                let raw = self.value_of_name(&data, &AmlName::root(), 0)?.as_integer()?;

                let value = (raw >> (field.bit_index % 8)) & bit_mask(field.bit_length);
                if field.bit_length > 32 {
                    Ok(Object::Register(value))
                } else {
                    Ok(Object::Integer(value))
                }
            }
        }
    }

    fn write_field(&mut self, field: &FieldUnit, value: u64) -> Result<(), AmlError> {
        match &field.kind {
            FieldUnitKind::Normal { region } => {
                let region = self.op_region_of(region)?;
                region.write_field(field.flags, field.bit_index, field.bit_length, value, &mut self.handler)
            }
            FieldUnitKind::Index { index, data } => {
                let (index, data) = (index.clone(), data.clone());
                self.store_to_name(&index, &AmlName::root(), Object::Integer((field.bit_index / 8) as u64), 0)?;

                let shift = field.bit_index % 8;
                let mask = bit_mask(field.bit_length);
                let base = match field.flags.update_rule() {
                    FieldUpdateRule::Preserve => self.value_of_name(&data, &AmlName::root(), 0)?.as_integer()?,
                    FieldUpdateRule::WriteAsOnes => u64::MAX,
                    FieldUpdateRule::WriteAsZeros => 0,
                };
                let merged = (base & !(mask << shift)) | ((value & mask) << shift);
                self.store_to_name(&data, &AmlName::root(), Object::Integer(merged), 0)
            }
        }
    }

    fn op_region_of(&self, name: &AmlName) -> Result<OpRegion, AmlError> {
        let id = self.namespace.id_for_path(name)?;
        match self.namespace.object(id)? {
            Object::OpRegion(region) => Ok(*region),
            _ => Err(AmlError::FieldRegionIsNotOpRegion),
        }
    }

    fn read_buffer_field(
        &mut self,
        buffer: &AmlName,
        offset_bits: usize,
        length_bits: usize,
    ) -> Result<Object, AmlError> {
        let id = self.namespace.id_for_path(buffer)?;
        match self.namespace.object(id)? {
            Object::Buffer(bytes) => {
                let mut out = [0u8; 8];
                copy_bits(bytes, offset_bits, &mut out, 0, length_bits);
                let value = u64::from_le_bytes(out);
                if length_bits > 32 {
                    Ok(Object::Register(value))
                } else {
                    Ok(Object::Integer(value))
                }
            }
            other => Err(AmlError::UnsupportedObjectKind(other.type_of())),
        }
    }

    fn write_buffer_field(
        &mut self,
        buffer: &AmlName,
        offset_bits: usize,
        length_bits: usize,
        value: u64,
    ) -> Result<(), AmlError> {
        let id = self.namespace.id_for_path(buffer)?;
        match self.namespace.object_mut(id)? {
            Object::Buffer(bytes) => {
                copy_bits(&value.to_le_bytes(), 0, bytes, offset_bits, length_bits);
                Ok(())
            }
            other => Err(AmlError::UnsupportedObjectKind(other.type_of())),
        }
    }
}

fn is_name_lead(op: u16) -> bool {
    op <= 0xff
        && matches!(
            op as u8,
            byte if crate::namespace::is_lead_name_char(byte)
                || byte == ROOT_CHAR
                || byte == PARENT_PREFIX_CHAR
                || byte == DUAL_NAME_PREFIX
                || byte == MULTI_NAME_PREFIX
        )
}

fn bit_mask(length: usize) -> u64 {
    if length >= 64 {
        u64::MAX
    } else {
        (1u64 << length) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHandler;
    use core::str::FromStr;

    fn interp() -> Interpreter<TestHandler> {
        Interpreter::new(TestHandler::new())
    }

    fn name(path: &str) -> AmlName {
        AmlName::from_str(path).unwrap()
    }

    /// Assemble a DefMethod around a body, for tables small enough for a one-byte
    /// PkgLength.
    fn def_method(seg: &[u8; 4], flags: u8, body: &[u8]) -> Vec<u8> {
        let length = 1 + 4 + 1 + body.len();
        assert!(length <= 0x3f);
        let mut out = vec![METHOD_OP, length as u8];
        out.extend_from_slice(seg);
        out.push(flags);
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn add_with_args() {
        let mut interpreter = interp();
        // Return (Arg0 + Arg1)
        interpreter.load_table(&def_method(b"MAIN", 2, &[0xa4, 0x72, 0x68, 0x69, 0x00])).unwrap();

        assert_eq!(
            interpreter.invoke_by_name("\\MAIN", vec![Object::Integer(5), Object::Integer(7)]),
            Ok(Object::Integer(12))
        );
        assert_eq!(
            interpreter.invoke_by_name("\\MAIN", vec![Object::Integer(5)]),
            Err(AmlError::MethodArgCountIncorrect)
        );
    }

    #[test]
    fn falling_off_the_end_returns_nothing() {
        let mut interpreter = interp();
        interpreter.load_table(&def_method(b"NOP_", 0, &[0xa3])).unwrap();
        assert_eq!(interpreter.invoke_by_name("\\NOP_", vec![]), Ok(Object::Uninitialized));
    }

    #[test]
    fn while_loop_sums() {
        let mut interpreter = interp();
        // Local0 = 0; Local1 = 0; While (Local1 < Arg0) { Local0 += Local1; Local1++ };
        // Return Local0
        #[rustfmt::skip]
        let body = [
            0x70, 0x00, 0x60,
            0x70, 0x00, 0x61,
            0xa2, 0x0c,
                0x95, 0x61, 0x68,
                0x70, 0x72, 0x60, 0x61, 0x00, 0x60,
                0x75, 0x61,
            0xa4, 0x60,
        ];
        interpreter.load_table(&def_method(b"SUM_", 1, &body)).unwrap();

        assert_eq!(interpreter.invoke_by_name("\\SUM_", vec![Object::Integer(5)]), Ok(Object::Integer(10)));
        assert_eq!(interpreter.invoke_by_name("\\SUM_", vec![Object::Integer(0)]), Ok(Object::Integer(0)));
    }

    #[test]
    fn if_else() {
        let mut interpreter = interp();
        // If (Arg0 == 1) { Return 10 } Else { Return 20 }
        #[rustfmt::skip]
        let body = [
            0xa0, 0x07,
                0x93, 0x68, 0x01,
                0xa4, 0x0a, 0x0a,
            0xa1, 0x04,
                0xa4, 0x0a, 0x14,
        ];
        interpreter.load_table(&def_method(b"PICK", 1, &body)).unwrap();

        assert_eq!(interpreter.invoke_by_name("\\PICK", vec![Object::Integer(1)]), Ok(Object::Integer(10)));
        assert_eq!(interpreter.invoke_by_name("\\PICK", vec![Object::Integer(2)]), Ok(Object::Integer(20)));
    }

    #[test]
    fn nested_if_does_not_claim_outer_else() {
        let mut interpreter = interp();
        let mut stream = vec![
            // Name (XXXX, 0)
            0x08, b'X', b'X', b'X', b'X', 0x00,
        ];
        // If (Arg0) { If (0) { Noop } } Else { Store (2, XXXX) }
        //
        // The inner If's then-block ends exactly where the outer one's does, so the
        // outer Else must not be taken as the inner If's else-branch.
        #[rustfmt::skip]
        let body = [
            0xa0, 0x06, 0x68,
                0xa0, 0x03, 0x00, 0xa3,
            0xa1, 0x08,
                0x70, 0x0a, 0x02, b'X', b'X', b'X', b'X',
        ];
        stream.extend(def_method(b"TST_", 1, &body));
        interpreter.load_table(&stream).unwrap();

        interpreter.invoke_by_name("\\TST_", vec![Object::Integer(1)]).unwrap();
        assert_eq!(interpreter.eval_simple(&name("\\XXXX")), Ok(Object::Integer(0)));

        interpreter.invoke_by_name("\\TST_", vec![Object::Integer(0)]).unwrap();
        assert_eq!(interpreter.eval_simple(&name("\\XXXX")), Ok(Object::Integer(2)));
    }

    #[test]
    fn method_names_are_torn_down() {
        let mut interpreter = interp();
        // Name (TMP_, 5); Return (TMP_)
        #[rustfmt::skip]
        let body = [
            0x08, b'T', b'M', b'P', b'_', 0x0a, 0x05,
            0xa4, b'T', b'M', b'P', b'_',
        ];
        interpreter.load_table(&def_method(b"CRT_", 0, &body)).unwrap();

        assert_eq!(interpreter.invoke_by_name("\\CRT_", vec![]), Ok(Object::Integer(5)));
        assert_eq!(
            interpreter.eval_simple(&name("\\CRT_.TMP_")),
            Err(AmlError::ObjectDoesNotExist(name("\\CRT_.TMP_")))
        );
        // A second invocation recreates the name cleanly
        assert_eq!(interpreter.invoke_by_name("\\CRT_", vec![]), Ok(Object::Integer(5)));
    }

    #[test]
    fn package_index_deref() {
        let mut interpreter = interp();
        #[rustfmt::skip]
        let mut stream = vec![
            // Name (PKG_, Package (3) { 1, 2, 3 })
            0x08, b'P', b'K', b'G', b'_',
            0x12, 0x08, 0x03, 0x0a, 0x01, 0x0a, 0x02, 0x0a, 0x03,
        ];
        // Return (DerefOf (Index (PKG_, Arg0)))
        stream.extend(def_method(b"GET_", 1, &[0xa4, 0x83, 0x88, b'P', b'K', b'G', b'_', 0x68, 0x00]));
        interpreter.load_table(&stream).unwrap();

        assert_eq!(interpreter.invoke_by_name("\\GET_", vec![Object::Integer(1)]), Ok(Object::Integer(2)));
        // Indexing past the end of the package reads as zero, starting at the
        // first out-of-range element
        assert_eq!(interpreter.invoke_by_name("\\GET_", vec![Object::Integer(3)]), Ok(Object::Integer(0)));
        assert_eq!(interpreter.invoke_by_name("\\GET_", vec![Object::Integer(9)]), Ok(Object::Integer(0)));
    }

    #[test]
    fn invoking_a_missing_name_fails_cleanly() {
        let mut interpreter = interp();
        interpreter.load_table(&def_method(b"MAIN", 0, &[0xa4, 0x00])).unwrap();

        assert_eq!(
            interpreter.invoke_by_name("\\NOPE", vec![]),
            Err(AmlError::ObjectDoesNotExist(name("\\NOPE")))
        );
        assert_eq!(
            interpreter.invoke_by_name("\\MAIN.NOPE", vec![]),
            Err(AmlError::ObjectDoesNotExist(name("\\MAIN.NOPE")))
        );
    }

    #[test]
    fn store_into_package_element() {
        let mut interpreter = interp();
        #[rustfmt::skip]
        let mut stream = vec![
            0x08, b'P', b'K', b'G', b'_',
            0x12, 0x08, 0x03, 0x0a, 0x01, 0x0a, 0x02, 0x0a, 0x03,
        ];
        // Store (0x2a, Index (PKG_, 1))
        stream.extend(def_method(b"SET_", 0, &[0x70, 0x0a, 0x2a, 0x88, b'P', b'K', b'G', b'_', 0x01, 0x00]));
        interpreter.load_table(&stream).unwrap();

        interpreter.invoke_by_name("\\SET_", vec![]).unwrap();
        assert_eq!(
            interpreter.eval_simple(&name("\\PKG_")),
            Ok(Object::Package(vec![Object::Integer(1), Object::Integer(0x2a), Object::Integer(3)]))
        );
    }

    #[test]
    fn buffer_fields() {
        let mut interpreter = interp();
        #[rustfmt::skip]
        let stream = vec![
            // Name (BUF_, Buffer (4) { 1, 2, 3, 4 })
            0x08, b'B', b'U', b'F', b'_',
            0x11, 0x07, 0x0a, 0x04, 0x01, 0x02, 0x03, 0x04,
            // CreateWordField (BUF_, 1, WRD_)
            0x8b, b'B', b'U', b'F', b'_', 0x01, b'W', b'R', b'D', b'_',
            // Store (0xbeef, WRD_)
            0x70, 0x0b, 0xef, 0xbe, b'W', b'R', b'D', b'_',
        ];
        interpreter.load_table(&stream).unwrap();

        assert_eq!(interpreter.eval_simple(&name("\\WRD_")), Ok(Object::Integer(0xbeef)));
        assert_eq!(
            interpreter.eval_simple(&name("\\BUF_")),
            Ok(Object::Buffer(vec![0x01, 0xef, 0xbe, 0x04]))
        );
    }

    #[test]
    fn wide_buffer_field_reads_as_register() {
        let mut interpreter = interp();
        #[rustfmt::skip]
        let stream = vec![
            // Name (BUF_, Buffer (8) { 0x0d, 0xf0, 0xfe, 0xca, 0xef, 0xbe, 0xad, 0xde })
            0x08, b'B', b'U', b'F', b'_',
            0x11, 0x0b, 0x0a, 0x08, 0x0d, 0xf0, 0xfe, 0xca, 0xef, 0xbe, 0xad, 0xde,
            // CreateQWordField (BUF_, 0, QWD_)
            0x8f, b'B', b'U', b'F', b'_', 0x00, b'Q', b'W', b'D', b'_',
        ];
        interpreter.load_table(&stream).unwrap();

        assert_eq!(
            interpreter.eval_simple(&name("\\QWD_")),
            Ok(Object::Register(0xdead_beef_cafe_f00d))
        );
    }

    #[test]
    fn size_of() {
        let mut interpreter = interp();
        #[rustfmt::skip]
        let mut stream = vec![
            0x08, b'B', b'U', b'F', b'_',
            0x11, 0x07, 0x0a, 0x04, 0x01, 0x02, 0x03, 0x04,
        ];
        // Return (SizeOf (BUF_))
        stream.extend(def_method(b"SIZE", 0, &[0xa4, 0x87, b'B', b'U', b'F', b'_']));
        interpreter.load_table(&stream).unwrap();

        assert_eq!(interpreter.invoke_by_name("\\SIZE", vec![]), Ok(Object::Integer(4)));
    }

    #[test]
    fn explicit_conversions() {
        let mut interpreter = interp();
        // Return (ToInteger (Buffer (2) { 0x34, 0x12 }))
        interpreter
            .load_table(&def_method(b"TOI_", 0, &[0xa4, 0x99, 0x11, 0x05, 0x0a, 0x02, 0x34, 0x12, 0x00]))
            .unwrap();
        assert_eq!(interpreter.invoke_by_name("\\TOI_", vec![]), Ok(Object::Integer(0x1234)));

        // ToBuffer (0x1234, Local0); Return (Local0)
        interpreter
            .load_table(&def_method(b"TOB_", 0, &[0x96, 0x0b, 0x34, 0x12, 0x60, 0xa4, 0x60]))
            .unwrap();
        assert_eq!(
            interpreter.invoke_by_name("\\TOB_", vec![]),
            Ok(Object::Buffer(vec![0x34, 0x12, 0, 0, 0, 0, 0, 0]))
        );
    }

    #[test]
    fn op_region_field_access() {
        let mut interpreter = interp();
        #[rustfmt::skip]
        let stream = vec![
            // OperationRegion (GPIO, SystemMemory, 0x100, 0x10)
            0x5b, 0x80, b'G', b'P', b'I', b'O', 0x00, 0x0b, 0x00, 0x01, 0x0a, 0x10,
            // Field (GPIO, AnyAcc, NoLock, Preserve) { LOW_, 8, HIGH, 8 }
            0x5b, 0x81, 0x10, b'G', b'P', b'I', b'O', 0x00,
                b'L', b'O', b'W', b'_', 0x08,
                b'H', b'I', b'G', b'H', 0x08,
            // Store (0x5a, LOW_); Store (0xa5, HIGH)
            0x70, 0x0a, 0x5a, b'L', b'O', b'W', b'_',
            0x70, 0x0a, 0xa5, b'H', b'I', b'G', b'H',
        ];
        interpreter.load_table(&stream).unwrap();

        assert_eq!(interpreter.handler().read_u8(0x100), 0x5a);
        assert_eq!(interpreter.handler().read_u8(0x101), 0xa5);
        assert_eq!(interpreter.eval_simple(&name("\\LOW_")), Ok(Object::Integer(0x5a)));
    }

    #[test]
    fn wide_field_reads_as_register() {
        let mut interpreter = interp();
        interpreter.handler().write_u64(0x200, 0xdead_beef_0000_1234);
        #[rustfmt::skip]
        let stream = vec![
            // OperationRegion (REGS, SystemMemory, 0x200, 0x10)
            0x5b, 0x80, b'R', b'E', b'G', b'S', 0x00, 0x0b, 0x00, 0x02, 0x0a, 0x10,
            // Field (REGS, AnyAcc, NoLock, Preserve) { WIDE, 64 }
            0x5b, 0x81, 0x0c, b'R', b'E', b'G', b'S', 0x00,
                b'W', b'I', b'D', b'E', 0x40, 0x04,
        ];
        interpreter.load_table(&stream).unwrap();

        assert_eq!(interpreter.eval_simple(&name("\\WIDE")), Ok(Object::Register(0xdead_beef_0000_1234)));
    }

    #[test]
    fn index_fields() {
        let mut interpreter = interp();
        #[rustfmt::skip]
        let stream = vec![
            // OperationRegion (IREG, SystemMemory, 0x300, 0x4)
            0x5b, 0x80, b'I', b'R', b'E', b'G', 0x00, 0x0b, 0x00, 0x03, 0x0a, 0x04,
            // Field (IREG, AnyAcc, NoLock, Preserve) { IDX_, 8, DAT_, 8 }
            0x5b, 0x81, 0x10, b'I', b'R', b'E', b'G', 0x00,
                b'I', b'D', b'X', b'_', 0x08,
                b'D', b'A', b'T', b'_', 0x08,
            // IndexField (IDX_, DAT_, AnyAcc, NoLock, Preserve) { REG0, 8, REG1, 8 }
            0x5b, 0x86, 0x14,
                b'I', b'D', b'X', b'_', b'D', b'A', b'T', b'_', 0x00,
                b'R', b'E', b'G', b'0', 0x08,
                b'R', b'E', b'G', b'1', 0x08,
            // Store (0x77, REG1)
            0x70, 0x0a, 0x77, b'R', b'E', b'G', b'1',
        ];
        interpreter.load_table(&stream).unwrap();

        // The store selected register 1 through the index field, then wrote the data field
        assert_eq!(interpreter.handler().read_u8(0x300), 1);
        assert_eq!(interpreter.handler().read_u8(0x301), 0x77);
        assert_eq!(interpreter.eval_simple(&name("\\REG1")), Ok(Object::Integer(0x77)));
    }

    #[test]
    fn index_field_bit_register() {
        let mut interpreter = interp();
        #[rustfmt::skip]
        let stream = vec![
            // OperationRegion (BREG, SystemMemory, 0x500, 0x4)
            0x5b, 0x80, b'B', b'R', b'E', b'G', 0x00, 0x0b, 0x00, 0x05, 0x0a, 0x04,
            // Field (BREG, AnyAcc, NoLock, Preserve) { IDXB, 8, DATB, 8 }
            0x5b, 0x81, 0x10, b'B', b'R', b'E', b'G', 0x00,
                b'I', b'D', b'X', b'B', 0x08,
                b'D', b'A', b'T', b'B', 0x08,
            // IndexField (IDXB, DATB, AnyAcc, NoLock, Preserve) { FLG_, 1 }
            0x5b, 0x86, 0x0f,
                b'I', b'D', b'X', b'B', b'D', b'A', b'T', b'B', 0x00,
                b'F', b'L', b'G', b'_', 0x01,
            // Store (One, FLG_)
            0x70, 0x01, b'F', b'L', b'G', b'_',
        ];
        interpreter.load_table(&stream).unwrap();

        assert_eq!(interpreter.handler().read_u8(0x500), 0);
        assert_eq!(interpreter.handler().read_u8(0x501), 1);
        assert_eq!(interpreter.eval_simple(&name("\\FLG_")), Ok(Object::Integer(1)));
    }

    #[test]
    fn index_fields_wide_data() {
        let mut interpreter = interp();
        #[rustfmt::skip]
        let stream = vec![
            // OperationRegion (WREG, SystemMemory, 0x400, 0x10)
            0x5b, 0x80, b'W', b'R', b'E', b'G', 0x00, 0x0b, 0x00, 0x04, 0x0a, 0x10,
            // Field (WREG, AnyAcc, NoLock, Preserve) { IDXW, 8, Offset (4), DATW, 32 }
            0x5b, 0x81, 0x12, b'W', b'R', b'E', b'G', 0x00,
                b'I', b'D', b'X', b'W', 0x08,
                0x00, 0x18,
                b'D', b'A', b'T', b'W', 0x20,
            // IndexField (IDXW, DATW, AnyAcc, NoLock, Preserve) { RW0_, 32, RH0_, 16 }
            0x5b, 0x86, 0x14,
                b'I', b'D', b'X', b'W', b'D', b'A', b'T', b'W', 0x00,
                b'R', b'W', b'0', b'_', 0x20,
                b'R', b'H', b'0', b'_', 0x10,
            // Store (0xaabbccdd, RW0_)
            0x70, 0x0c, 0xdd, 0xcc, 0xbb, 0xaa, b'R', b'W', b'0', b'_',
            // Store (0xabcd, RH0_)
            0x70, 0x0b, 0xcd, 0xab, b'R', b'H', b'0', b'_',
        ];
        interpreter.load_table(&stream).unwrap();

        // The second store selected index 4 and merged into the shared data register
        assert_eq!(interpreter.handler().read_u8(0x400), 4);
        assert_eq!(interpreter.eval_simple(&name("\\RW0_")), Ok(Object::Integer(0xaabbabcd)));
        assert_eq!(interpreter.eval_simple(&name("\\RH0_")), Ok(Object::Integer(0xabcd)));
    }

    #[test]
    fn scopes_and_devices() {
        let mut interpreter = interp();
        #[rustfmt::skip]
        let stream = vec![
            // Scope (\_SB) { Device (PCI0) { Name (_HID, 0x42) } }
            0x10, 0x14, 0x5c, b'_', b'S', b'B', b'_',
                0x5b, 0x82, 0x0c, b'P', b'C', b'I', b'0',
                    0x08, b'_', b'H', b'I', b'D', 0x0a, 0x42,
        ];
        interpreter.load_table(&stream).unwrap();

        assert_eq!(interpreter.eval_simple(&name("\\_SB.PCI0._HID")), Ok(Object::Integer(0x42)));
    }

    #[test]
    fn name_chains_resolve_with_bounded_depth() {
        use alloc::format;

        let mut interpreter = interp();
        // A chain of exactly MAX_RESOLUTION_DEPTH names still converges
        for i in 0..MAX_RESOLUTION_DEPTH - 1 {
            interpreter
                .namespace
                .insert(&name(&format!("\\CHN{}", i)), Object::NameString(name(&format!("CHN{}", i + 1))))
                .unwrap();
        }
        let last = format!("\\CHN{}", MAX_RESOLUTION_DEPTH - 1);
        interpreter.namespace.insert(&name(&last), Object::NameString(name("DEST"))).unwrap();
        interpreter.namespace.insert(&name("\\DEST"), Object::Integer(42)).unwrap();
        assert_eq!(interpreter.eval_simple(&name("\\CHN0")), Ok(Object::Integer(42)));

        // A cyclic chain fails instead of looping forever
        interpreter.namespace.insert(&name("\\CCCC"), Object::NameString(name("DDDD"))).unwrap();
        interpreter.namespace.insert(&name("\\DDDD"), Object::NameString(name("CCCC"))).unwrap();
        assert_eq!(interpreter.eval_simple(&name("\\CCCC")), Err(AmlError::ResolutionDidNotConverge));
    }

    #[test]
    fn store_through_arg_reference() {
        let mut interpreter = interp();
        let mut stream = vec![0x08, b'V', b'A', b'L', b'_', 0x00];
        // Store (0x63, Arg0)
        stream.extend(def_method(b"SET_", 1, &[0x70, 0x0a, 0x63, 0x68]));
        interpreter.load_table(&stream).unwrap();

        let reference = Object::Reference { kind: ReferenceKind::Alias(name("\\VAL_")) };
        interpreter.invoke_by_name("\\SET_", vec![reference]).unwrap();
        assert_eq!(interpreter.eval_simple(&name("\\VAL_")), Ok(Object::Integer(0x63)));
    }

    #[test]
    fn aliases_evaluate_and_store_through() {
        let mut interpreter = interp();
        #[rustfmt::skip]
        let stream = vec![
            // Name (REAL, 7); Alias (REAL, ALIA)
            0x08, b'R', b'E', b'A', b'L', 0x0a, 0x07,
            0x06, b'R', b'E', b'A', b'L', b'A', b'L', b'I', b'A',
            // Store (9, ALIA)
            0x70, 0x0a, 0x09, b'A', b'L', b'I', b'A',
        ];
        interpreter.load_table(&stream).unwrap();

        assert_eq!(interpreter.eval_simple(&name("\\ALIA")), Ok(Object::Integer(9)));
        assert_eq!(interpreter.eval_simple(&name("\\REAL")), Ok(Object::Integer(9)));
    }

    #[test]
    fn nested_method_invocation() {
        let mut interpreter = interp();
        // Method (DBL, 1) { Return (Arg0 * 2) }
        let mut stream = def_method(b"DBL_", 1, &[0xa4, 0x77, 0x68, 0x0a, 0x02, 0x00]);
        // Method (QUAD, 1) { Return (DBL (DBL (Arg0))) }
        stream.extend(def_method(
            b"QUAD",
            1,
            &[0xa4, b'D', b'B', b'L', b'_', b'D', b'B', b'L', b'_', 0x68],
        ));
        interpreter.load_table(&stream).unwrap();

        assert_eq!(interpreter.invoke_by_name("\\QUAD", vec![Object::Integer(3)]), Ok(Object::Integer(12)));
    }
}
