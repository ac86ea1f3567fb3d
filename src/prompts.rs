// src/prompts.rs
//! Prompt templates and fixed replies (Spanish).

use crate::session::ChatMessage;

/// Seed message of every general-path conversation.
pub const CONVERSATION_SYSTEM_PROMPT: &str = "Eres Agente de Planificación, un asistente especializado altamente inteligente en leyes de planificación de Puerto Rico.

CARACTERÍSTICAS:
- Analiza profundamente las preguntas del usuario
- Proporciona respuestas completas y detalladas
- Usa contexto de múltiples fuentes cuando es necesario
- Explica conceptos legales de manera clara
- Si es una pregunta legal/planificación, usa SOLO el texto proporcionado
- Si es pregunta general, responde libremente como un asistente avanzado
- Siempre sé útil, preciso y profesional
- Recomienda al usuario cómo formular la pregunta correctamente

CAPACIDADES ESPECIALES:
- Puedes analizar y comparar información entre diferentes tomos
- Puedes hacer resúmenes y síntesis
- Puedes explicar procedimientos y procesos
- Puedes identificar relaciones entre diferentes regulaciones
- Tienes acceso completo al glosario de términos legales (Tomo 12)

CONOCIMIENTO SOBRE LOS TOMOS:
Hay en total 11 tomos del Reglamento Conjunto 2020 + Glosario:
- Tomo 1: Sistema de Evaluación y Tramitación de Permisos para el Desarrollo
- Tomo 2: Disposiciones Generales
- Tomo 3: Permisos para Desarrollo y Negocios
- Tomo 4: Licencias y Certificaciones
- Tomo 5: Urbanización y Lotificación
- Tomo 6: Distritos de Calificación
- Tomo 7: Procesos
- Tomo 8: Edificabilidad
- Tomo 9: Infraestructura y Ambiente
- Tomo 10: Conservación Histórica
- Tomo 11: Querellas
- Glosario de términos especializados (Tomo 12)

Cuando el usuario pregunte por títulos de tomos, índice o definiciones, proporciona la información completa disponible.";

const VOLUME_SYSTEM_PROMPT: &str = "Eres Agente de planificación, un asistente legal experto que siempre busca la información en el texto proporcionado. Analiza completamente el contexto y proporciona respuestas exactas y completas.";

const DOCUMENT_SYSTEM_PROMPT: &str = "Eres Agente de planificación, experto en reglamentos de emergencia de Puerto Rico. Analiza el contenido del reglamento JP-RP-41 y proporciona respuestas precisas y completas. IMPORTANTE: Solo responde basándote en el contenido proporcionado del reglamento.";

/// Prompt for one tomo's context slice.
pub fn volume_messages(
    volume: u8,
    context: &str,
    question: &str,
    glossary_context: Option<&str>,
) -> Vec<ChatMessage> {
    let glossary = glossary_context
        .map(|g| format!("\n{g}\n"))
        .unwrap_or_default();
    let prompt = format!(
        "Eres Agente de planificación, un asistente legal especializado en las leyes de planificación de Puerto Rico.

CONTEXTO LEGAL DEL TOMO {volume}:
{context}
{glossary}
PREGUNTA DEL USUARIO: {question}

INSTRUCCIONES:
1. Analiza TODO el contexto legal proporcionado
2. La información está en el texto: encuéntrala y preséntala
3. Si se pregunta por cantidades, listas o números, cuenta y lista todo lo que encuentres
4. Proporciona respuestas completas y detalladas
5. Si es una lista, enumera todos los elementos
6. Mantén un tono profesional pero claro

RESPUESTA COMPLETA Y DETALLADA:"
    );
    vec![
        ChatMessage::system(VOLUME_SYSTEM_PROMPT),
        ChatMessage::user(prompt),
    ]
}

/// Prompt presenting one structured resource file (`label`: Flujograma/Tabla/Resolución).
pub fn resource_messages(label: &str, content: &str, question: &str) -> Vec<ChatMessage> {
    let upper = label.to_uppercase();
    let lower = label.to_lowercase();
    let prompt = format!(
        "Eres Agente de planificación, un asistente legal especializado en las leyes de planificación de Puerto Rico.

{upper} ESPECIALIZADO:
{content}

PREGUNTA DEL USUARIO: {question}

INSTRUCCIONES:
1. Este es un recurso oficial ({lower}) del sistema legal de Puerto Rico
2. Presenta la información de forma clara y estructurada
3. Si es un flujograma, explica los pasos secuencialmente
4. Si es una tabla, presenta los datos organizadamente
5. Mantén el formato visual con emojis y estructuras claras

RESPUESTA ESPECIALIZADA:"
    );
    vec![
        ChatMessage::system(format!(
            "Eres Agente de planificación, experto en presentar recursos legales ({lower}) de forma clara y estructurada."
        )),
        ChatMessage::user(prompt),
    ]
}

/// Prompt for the superseding regulation slice.
pub fn document_messages(
    context: &str,
    question: &str,
    glossary_context: Option<&str>,
) -> Vec<ChatMessage> {
    let glossary = glossary_context
        .map(|g| format!("\n{g}\n"))
        .unwrap_or_default();
    let prompt = format!(
        "Eres Agente de Planificación, especialista experto en el Reglamento de Emergencia JP-RP-41 de Puerto Rico.

CONTEXTO LEGAL DEL REGLAMENTO JP-RP-41:
{context}
{glossary}
CONSULTA DEL USUARIO: {question}

INSTRUCCIONES ESPECÍFICAS:
1. Analiza meticulosamente el contexto legal proporcionado
2. Identifica artículos, secciones o disposiciones específicas relevantes
3. Proporciona una respuesta estructurada y completa
4. Incluye referencias específicas del reglamento cuando sea posible
5. Si hay procedimientos, descríbelos paso a paso
6. Mantén un lenguaje claro pero técnicamente preciso
7. Indica siempre que la información proviene del Reglamento JP-RP-41

FORMATO DE RESPUESTA PREFERIDO:
- Respuesta directa a la consulta
- Referencias específicas del reglamento
- Procedimientos paso a paso (si aplica)
- Consideraciones adicionales importantes

RESPUESTA ESPECIALIZADA:"
    );
    vec![
        ChatMessage::system(DOCUMENT_SYSTEM_PROMPT),
        ChatMessage::user(prompt),
    ]
}

pub const VOLUME_COUNT_REPLY: &str = "📚 Este documento está compuesto por **11 tomos** en total (Tomo 1 al Tomo 11), que contienen las regulaciones completas de planificación de Puerto Rico. Cada tomo cubre diferentes aspectos de la legislación.\n\n**Además, tengo acceso a un Glosario completo (Tomo 12)** con definiciones de términos legales específicos.";

pub const VOLUME_TITLES_REPLY: &str = "**ÍNDICE COMPLETO DE LOS 11 TOMOS DEL REGLAMENTO CONJUNTO 2020**

**TOMO 1:** Sistema de Evaluación y Tramitación de Permisos para el Desarrollo
- Enfoque: Procedimientos administrativos, transparencia y uniformidad del sistema unificado
- Agencias: Junta de Planificación (JP), Oficina de Gerencia de Permisos (OGPe), Municipios Autónomos, Profesionales Autorizados

**TOMO 2:** Disposiciones Generales
- Enfoque: Procedimientos administrativos para permisos, consultas, certificaciones y documentos ambientales
- Aplicación: Ley 38-2017 LPAU, determinaciones finales y trámites que afecten operación de negocios

**TOMO 3:** Permisos para Desarrollo y Negocios
- Enfoque: Tipos de permisos, procedimientos para desarrollo de proyectos y operación de negocios
- Incluye: Permisos de medio ambiente, flujogramas de cambios de calificación

**TOMO 4:** Licencias y Certificaciones
- Enfoque: Diversos tipos de licencias y certificaciones requeridas para negocios y operaciones
- Regulación: Operaciones comerciales e industriales específicas

**TOMO 5:** Urbanización y Lotificación
- Enfoque: Proyectos de urbanización, procesos de lotificación y clasificaciones de terrenos
- Regulación: Desarrollo residencial y comercial, subdivisión de terrenos

**TOMO 6:** Distritos de Calificación
- Enfoque: Zonificación, clasificación de distritos y usos permitidos por zona
- Regulación: Ordenamiento territorial y usos de suelo

**TOMO 7:** Procesos
- Enfoque: Procedimientos específicos para diversos tipos de trámites y procesos administrativos
- Regulación: Metodologías y secuencias de tramitación

**TOMO 8:** Edificabilidad
- Enfoque: Regulaciones sobre construcción, densidad y parámetros de edificación
- Regulación: Altura, retiros, cabida y otros parámetros constructivos

**TOMO 9:** Infraestructura y Ambiente
- Enfoque: Requisitos de infraestructura, consideraciones ambientales y sostenibilidad
- Regulación: Servicios públicos, impacto ambiental, conservación

**TOMO 10:** Conservación Histórica
- Enfoque: Protección del patrimonio histórico, sitios arqueológicos y edificaciones históricas
- Regulación: Preservación cultural y arquitectónica

**TOMO 11:** Querellas
- Enfoque: Procedimientos para revisiones administrativas, querellas, multas y auditorías
- Regulación: Recursos administrativos y procesos de impugnación ante la División de Revisiones Administrativas de la OGPe

**RECURSOS ADICIONALES:**
- Glosario de términos especializados
- Tablas de cabida por distritos
- Flujogramas de procesos específicos
- Resoluciones de la Junta de Planificación
- Documentación de sitios históricos y terrenos públicos";

pub const NO_RESOURCES_REPLY: &str = "🔍 No encontré recursos disponibles para esa consulta.\n\n💡 *Escribe 'índice' para ver qué flujogramas, tablas de cabida y resoluciones hay en cada tomo, o indica otro tomo.*";

pub const VOLUME_RETRY_REPLY: &str = "Permíteme revisar nuevamente los documentos legales para encontrar esa información específica. Por favor, intenta reformular tu pregunta de manera más específica o indica un tomo particular si conoces dónde puede estar la información.";

/// Footer when ranking chose fewer than three tomos.
pub fn search_footer(volumes: &[u8]) -> String {
    let list = volumes
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "\n\n💡 *Búsqueda optimizada en {} tomo(s) más relevante(s): {}. Para una búsqueda más amplia, especifica un tomo o haz una pregunta más específica.*",
        volumes.len(),
        list
    )
}

/// What the single-document mode has loaded.
pub fn document_info_reply(document_chars: Option<usize>) -> String {
    match document_chars {
        Some(chars) => format!(
            "**📋 REGLAMENTO DE EMERGENCIA JP-RP-41**

Este sistema utiliza exclusivamente el **Reglamento de Emergencia JP-RP-41**, la regulación más actualizada para planificación en Puerto Rico.

**Características del reglamento:**
- Documento completo y actualizado: {chars} caracteres
- Cobertura: Todas las disposiciones de planificación y desarrollo
- Estado: Vigente y operativo para todas las consultas legales

**Capacidades de búsqueda:**
✅ Búsqueda inteligente por temas específicos
✅ Análisis contextual de regulaciones
✅ Interpretación de procedimientos y requisitos
✅ Consultas sobre permisos y certificaciones
✅ Información sobre zonificación y uso de suelo

💡 **Nota importante:** Toda la información legal proviene exclusivamente del Reglamento de Emergencia JP-RP-41."
        ),
        None => DOCUMENT_UNAVAILABLE_REPLY.to_string(),
    }
}

pub const DOCUMENT_UNAVAILABLE_REPLY: &str = "⚠️ **Reglamento de Emergencia JP-RP-41 no disponible**\n\nEl sistema no puede procesar su consulta porque el reglamento de emergencia no está cargado.";

pub const DOCUMENT_NOT_FOUND_REPLY: &str = "🔍 **Búsqueda completada en Reglamento de Emergencia JP-RP-41**

No se encontró información específica para su consulta en el reglamento de emergencia.

**Sugerencias:**
- Reformule su pregunta con términos más específicos
- Consulte sobre permisos, zonificación, procedimientos o normativas específicas

**Temas disponibles:** permisos, licencias, zonificación, construcción, medio ambiente, planificación, desarrollo urbano, etc.";

/// Wraps a generated answer from the superseding regulation.
pub fn document_answer(content: &str) -> String {
    format!(
        "🚨 **REGLAMENTO DE EMERGENCIA JP-RP-41 (ACTUALIZADO)**:\n\n{content}\n\n---\n💡 *Información extraída del Reglamento de Emergencia JP-RP-41*"
    )
}
